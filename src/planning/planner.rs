//! Task Planner：把自然语言请求 + 已完成任务转为「一个原子任务 + 目标 Worker 标识」
//!
//! 每一步都重新规划，除 completed_tasks 外不携带任何跨步状态。
//! parse_planner_reply 从 LLM 文本中提取 JSON（```json 代码块或首尾大括号）并解析为 PlanResult。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::TaskRecord;
use crate::llm::{LlmClient, Message};
use crate::planning::prompts::{delegator_system_prompt, planning_message};
use crate::planning::schema::{planner_reply_schema_json, PlannerReply};

/// 传给 Planner 的已完成任务条数上限
const HISTORY_WINDOW: usize = 5;

/// 规划结果；worker 为原始标识字符串，由 Delegator 在边界处解析为 WorkerId
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResult {
    pub done: bool,
    pub task: String,
    pub worker: String,
}

impl PlanResult {
    pub fn done() -> Self {
        Self {
            done: true,
            task: String::new(),
            worker: String::new(),
        }
    }

    pub fn dispatch(task: impl Into<String>, worker: impl Into<String>) -> Self {
        Self {
            done: false,
            task: task.into(),
            worker: worker.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlannerError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("unparseable planner reply: {0}")]
    Parse(String),

    #[error("planner returned an empty task for worker '{0}'")]
    EmptyTask(String),
}

#[async_trait]
pub trait TaskPlanner: Send + Sync {
    async fn plan(
        &self,
        original_request: &str,
        completed_tasks: &[TaskRecord],
    ) -> Result<PlanResult, PlannerError>;
}

/// 解析 LLM 回复：agent 为 END 时表示请求已完成；否则 task = action (+ " with parameters " + 参数 JSON)
pub fn parse_planner_reply(output: &str) -> Result<PlanResult, PlannerError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            &trimmed[start..=end]
        } else {
            return Err(PlannerError::Parse(trimmed.to_string()));
        }
    } else {
        return Err(PlannerError::Parse(trimmed.to_string()));
    };

    let reply: PlannerReply = serde_json::from_str(json_str)
        .map_err(|e| PlannerError::Parse(format!("{e}: {json_str}")))?;

    if reply.agent.trim().eq_ignore_ascii_case("END") {
        return Ok(PlanResult::done());
    }

    let action = reply.action.trim();
    if action.is_empty() {
        return Err(PlannerError::EmptyTask(reply.agent));
    }
    let task = if reply.parameters.is_empty() {
        action.to_string()
    } else {
        let params = serde_json::to_string(&reply.parameters)
            .map_err(|e| PlannerError::Parse(e.to_string()))?;
        format!("{action} with parameters {params}")
    };

    Ok(PlanResult::dispatch(task, reply.agent.trim()))
}

/// 基于 LLM 的 Planner：持有 LLM 与 system prompt
pub struct LlmTaskPlanner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmTaskPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: delegator_system_prompt(&planner_reply_schema_json()),
        }
    }
}

#[async_trait]
impl TaskPlanner for LlmTaskPlanner {
    async fn plan(
        &self,
        original_request: &str,
        completed_tasks: &[TaskRecord],
    ) -> Result<PlanResult, PlannerError> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(planning_message(
                original_request,
                completed_tasks,
                HISTORY_WINDOW,
            )),
        ];
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(PlannerError::Llm)?;
        tracing::debug!(reply = %output, "planner reply");
        parse_planner_reply(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::workers::WorkerId;

    #[test]
    fn test_parse_plain_json() {
        let plan = parse_planner_reply(
            r#"{"agent": "connector_agent", "action": "Download a.csv", "parameters": {"bucket_name": "B", "project_id": "P"}}"#,
        )
        .unwrap();
        assert!(!plan.done);
        assert_eq!(plan.worker, "connector_agent");
        assert_eq!(
            plan.task,
            r#"Download a.csv with parameters {"bucket_name":"B","project_id":"P"}"#
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let output = "Here you go:\n```json\n{\"agent\": \"warehouse\", \"action\": \"Create dataset emp_data\"}\n```";
        let plan = parse_planner_reply(output).unwrap();
        assert_eq!(plan, PlanResult::dispatch("Create dataset emp_data", "warehouse"));
    }

    #[test]
    fn test_parse_end_marks_done() {
        let plan = parse_planner_reply(r#"{"agent": "END", "action": "The task has been completed.", "parameters": {}}"#)
            .unwrap();
        assert!(plan.done);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_planner_reply("I think we should download the file"),
            Err(PlannerError::Parse(_))
        ));
        assert!(matches!(
            parse_planner_reply("{\"agent\": 3}"),
            Err(PlannerError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_action() {
        assert_eq!(
            parse_planner_reply(r#"{"agent": "transformer", "action": "  "}"#).unwrap_err(),
            PlannerError::EmptyTask("transformer".to_string())
        );
    }

    #[tokio::test]
    async fn test_llm_planner_with_mock_dispatches_then_finishes() {
        let planner = LlmTaskPlanner::new(Arc::new(MockLlmClient));
        let first = planner.plan("download a.csv from bucket B", &[]).await.unwrap();
        assert!(!first.done);
        assert_eq!(first.worker.parse::<WorkerId>().unwrap(), WorkerId::Connector);
        assert_eq!(first.task, "download a.csv from bucket B");

        let done = TaskRecord {
            description: first.task.clone(),
            worker: WorkerId::Connector,
            result_summary: "ok".to_string(),
            context_index: 0,
        };
        let second = planner.plan("download a.csv from bucket B", &[done]).await.unwrap();
        assert!(second.done);
    }
}
