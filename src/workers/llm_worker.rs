//! LLM Worker：以角色 prompt 驱动 LLM 完成单个原子任务，回复按哨兵分类

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};
use crate::memory::ContextEntry;
use crate::workers::prompts::role_prompt;
use crate::workers::{Worker, WorkerId, WorkerResult, ERROR_SENTINEL};

/// 上下文中单条回复的最大字符数
const CONTEXT_PREVIEW_CHARS: usize = 600;

pub struct LlmWorker {
    id: WorkerId,
    llm: Arc<dyn LlmClient>,
    role_prompt: String,
}

impl LlmWorker {
    pub fn new(id: WorkerId, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            id,
            llm,
            role_prompt: role_prompt(id),
        }
    }
}

fn render_task(task: &str, recent: &[ContextEntry]) -> String {
    if recent.is_empty() {
        return format!("Task: {task}");
    }
    let context = recent
        .iter()
        .map(|e| {
            let response: String = e.raw_response.chars().take(CONTEXT_PREVIEW_CHARS).collect();
            format!("- [{}] {} => {}", e.actor, e.task_description, response)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Task: {task}\n\nRecent context:\n{context}")
}

#[async_trait]
impl Worker for LlmWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn execute(&self, task_description: &str, recent_context: &[ContextEntry]) -> WorkerResult {
        let messages = vec![
            Message::system(self.role_prompt.clone()),
            Message::user(render_task(task_description, recent_context)),
        ];
        match self.llm.complete(&messages).await {
            Ok(reply) => WorkerResult::from_reply(&reply),
            Err(e) => WorkerResult::failure(format!("{ERROR_SENTINEL} LLM request failed: {e}")),
        }
    }
}
