//! Conductor - 数据工程多智能体编排核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 工作流状态、Delegator 路由状态机、Conflict Resolver、运行驱动
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 上下文日志（只追加）、分词与 TF-IDF 证据检索
//! - **observability**: 日志初始化
//! - **planning**: Task Planner 抽象与 LLM 实现
//! - **runtime**: 按配置装配 Orchestrator（CLI / HTTP 共用）
//! - **workers**: Worker 契约、注册表、带超时的执行器与 LLM Worker

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod planning;
pub mod runtime;
pub mod workers;

pub use crate::core::{Orchestrator, RunConfig, RunResult, RunStatus};
