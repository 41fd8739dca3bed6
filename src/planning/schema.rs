//! Planner 回复格式与其 JSON Schema（schemars 生成，拼入 system prompt，减少 LLM 输出格式错误）

use std::collections::BTreeMap;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// Planner 回复：`{"agent": "...", "action": "...", "parameters": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannerReply {
    /// 目标 Worker：connector / transformer / warehouse；请求已完成时为 END
    pub agent: String,
    /// 原子任务描述
    pub action: String,
    /// 任务所需参数（如 project_id、bucket_name、filename）
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// 返回 PlannerReply 的 JSON Schema 字符串
pub fn planner_reply_schema_json() -> String {
    let schema = schema_for!(PlannerReply);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_reply_fields() {
        let schema = planner_reply_schema_json();
        assert!(schema.contains("\"agent\""));
        assert!(schema.contains("\"action\""));
        assert!(schema.contains("\"parameters\""));
    }
}
