//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

/// 根据配置与环境变量选择 LLM 后端：provider = "mock" 或未设置 API Key 时使用 Mock
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());

    match (provider.as_str(), api_key) {
        ("mock", _) => {
            tracing::info!("Using Mock LLM (configured)");
            Arc::new(MockLlmClient)
        }
        (_, Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.model);
            Arc::new(
                OpenAiClient::new(cfg.base_url.as_deref(), &cfg.model, Some(&key))
                    .with_temperature(cfg.temperature)
                    .with_max_tokens(cfg.max_tokens),
            )
        }
        (_, None) => {
            tracing::warn!("{} not set, using Mock LLM", cfg.api_key_env);
            Arc::new(MockLlmClient)
        }
    }
}
