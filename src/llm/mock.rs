//! Mock LLM 客户端（用于本地试跑与测试，无需 API）
//!
//! 作为 Planner 时：尚无已完成任务则把整个请求派给 connector，否则回复 END；
//! 作为 Worker 时：回显任务，视为成功。

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};
use crate::planning::prompts::{DELEGATOR_ROLE_MARKER, NO_COMPLETED_TASKS, REQUEST_LABEL};

#[derive(Debug, Default)]
pub struct MockLlmClient;

impl MockLlmClient {
    fn plan_reply(user: &str) -> String {
        if !user.contains(NO_COMPLETED_TASKS) {
            return r#"{"agent": "END", "action": "The task has been completed.", "parameters": {}}"#
                .to_string();
        }
        let request = user
            .lines()
            .find_map(|l| l.strip_prefix(REQUEST_LABEL))
            .map(str::trim)
            .unwrap_or("(no request)");
        serde_json::json!({
            "agent": "connector_agent",
            "action": request,
            "parameters": {},
        })
        .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let is_planner = messages
            .iter()
            .any(|m| m.role == Role::System && m.content.contains(DELEGATOR_ROLE_MARKER));
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        if is_planner {
            Ok(Self::plan_reply(last_user))
        } else {
            Ok(format!("Mock worker completed: {last_user}"))
        }
    }
}
