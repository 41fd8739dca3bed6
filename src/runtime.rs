//! 按配置装配 Orchestrator（CLI 与 HTTP 服务共用）

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::core::{Orchestrator, RunConfig};
use crate::llm::create_llm_from_config;
use crate::planning::LlmTaskPlanner;
use crate::workers::{LlmWorker, WorkerId, WorkerRegistry};

/// 所有 Worker 共享同一个 LLM 客户端，各自使用内置角色 prompt
pub fn build_registry(cfg: &AppConfig) -> WorkerRegistry {
    let llm = create_llm_from_config(&cfg.llm);
    let mut registry = WorkerRegistry::new();
    for id in WorkerId::ALL {
        registry.register(LlmWorker::new(id, Arc::clone(&llm)));
    }
    registry
}

pub fn build_orchestrator(cfg: &AppConfig, run_config: RunConfig) -> anyhow::Result<Orchestrator> {
    let planner = Arc::new(LlmTaskPlanner::new(create_llm_from_config(&cfg.llm)));
    let registry = build_registry(cfg);
    Orchestrator::new(planner, registry, run_config).context("failed to assemble orchestrator")
}
