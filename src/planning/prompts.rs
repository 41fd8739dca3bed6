//! Planner prompt 模板

use crate::core::TaskRecord;
use crate::workers::WorkerId;

/// Delegator system prompt 的身份标记（Mock LLM 用来识别规划请求）
pub const DELEGATOR_ROLE_MARKER: &str = "you are the Delegator";
pub const REQUEST_LABEL: &str = "User request:";
pub const NO_COMPLETED_TASKS: &str = "Tasks completed so far: (none)";

pub fn delegator_system_prompt(reply_schema: &str) -> String {
    let workers = WorkerId::ALL
        .iter()
        .map(|id| format!("- {}: {}", id, id.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"In a Data Engineering team, {DELEGATOR_ROLE_MARKER}. Understand the user's request, break it into atomic tasks and assign exactly ONE next task to the right worker.

Workers:
{workers}

Reply with a single JSON object matching this schema:
{reply_schema}

Example:
{{"agent": "connector", "action": "Download the file abc.csv from bucket x", "parameters": {{"project_id": "y", "bucket_name": "x", "filename": "abc.csv"}}}}

Include every parameter the task needs, using only values stated in the request or in completed tasks.
When the request is fully satisfied, reply with:
{{"agent": "END", "action": "The task has been completed.", "parameters": {{}}}}

Do not provide explanations or any other text."#
    )
}

/// 规划输入：原始请求 + 最近 window 条已完成任务
pub fn planning_message(original_request: &str, completed_tasks: &[TaskRecord], window: usize) -> String {
    let recent = &completed_tasks[completed_tasks.len().saturating_sub(window)..];
    if recent.is_empty() {
        return format!("{REQUEST_LABEL} {original_request}\n\n{NO_COMPLETED_TASKS}");
    }

    let tasks: Vec<serde_json::Value> = recent
        .iter()
        .map(|t| {
            serde_json::json!({
                "worker": t.worker,
                "task": t.description,
                "result": t.result_summary,
            })
        })
        .collect();
    format!(
        "{REQUEST_LABEL} {original_request}\n\nTasks completed so far:\n{}",
        serde_json::to_string_pretty(&tasks).unwrap_or_default()
    )
}
