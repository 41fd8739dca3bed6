//! Worker 注册表
//!
//! 所有 Worker 实现 Worker trait（id / execute），由 WorkerRegistry 按 WorkerId 注册与查找；
//! 注册表必须覆盖全部 WorkerId（total mapping），否则 WorkerExecutor 拒绝构建。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::ContextEntry;
use crate::workers::{WorkerId, WorkerResult};

/// Worker trait：在自己的领域里解释 task_description，返回结构化结果或带哨兵的失败。
/// 必须能安全地以修正后的任务重复调用。
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    /// recent_context 为上下文日志中最近的若干条记录（按时间顺序）
    async fn execute(&self, task_description: &str, recent_context: &[ContextEntry]) -> WorkerResult;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerRegistryError {
    #[error("no worker registered for: {0:?}")]
    Incomplete(Vec<WorkerId>),
}

/// 注册表：WorkerId -> Arc<dyn Worker>
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerId, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Worker；同一 id 重复注册时后者覆盖前者
    pub fn register(&mut self, worker: impl Worker + 'static) {
        self.register_arc(Arc::new(worker));
    }

    pub fn register_arc(&mut self, worker: Arc<dyn Worker>) {
        self.workers.insert(worker.id(), worker);
    }

    pub fn get(&self, id: WorkerId) -> Option<Arc<dyn Worker>> {
        self.workers.get(&id).cloned()
    }

    /// 尚未注册的 WorkerId（按枚举顺序）
    pub fn missing(&self) -> Vec<WorkerId> {
        WorkerId::ALL
            .into_iter()
            .filter(|id| !self.workers.contains_key(id))
            .collect()
    }

    pub fn ensure_complete(&self) -> Result<(), WorkerRegistryError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkerRegistryError::Incomplete(missing))
        }
    }
}
