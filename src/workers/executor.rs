//! Worker 执行器
//!
//! 持有完整的 WorkerRegistry 与调用超时，execute(worker, task, recent) 在超时内调用对应 Worker，
//! 超时视同失败（带哨兵）；结果统一经 WorkerResult::normalized；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::memory::ContextEntry;
use crate::workers::{WorkerId, WorkerRegistry, WorkerRegistryError, WorkerResult, ERROR_SENTINEL};

/// 任务预览最大字符数（审计日志）
const TASK_PREVIEW_CHARS: usize = 200;

pub struct WorkerExecutor {
    registry: WorkerRegistry,
    timeout: Duration,
}

impl WorkerExecutor {
    pub fn new(registry: WorkerRegistry, timeout: Duration) -> Result<Self, WorkerRegistryError> {
        registry.ensure_complete()?;
        Ok(Self { registry, timeout })
    }

    /// 执行指定 Worker；超时返回带哨兵的 Failure，结果一律经过哨兵规范化
    pub async fn execute(
        &self,
        worker: WorkerId,
        task_description: &str,
        recent_context: &[ContextEntry],
    ) -> WorkerResult {
        let Some(handle) = self.registry.get(worker) else {
            return WorkerResult::failure(format!("{ERROR_SENTINEL} no worker registered for '{worker}'"));
        };

        let start = Instant::now();
        let result = match timeout(self.timeout, handle.execute(task_description, recent_context)).await {
            Ok(result) => result.normalized(),
            Err(_) => WorkerResult::failure(format!(
                "{ERROR_SENTINEL} worker '{worker}' timed out after {}s",
                self.timeout.as_secs_f32()
            )),
        };

        let outcome = match &result {
            WorkerResult::Success { .. } => "ok",
            WorkerResult::Failure { .. } => "error",
        };
        let audit = serde_json::json!({
            "event": "worker_audit",
            "worker": worker.as_str(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "task_preview": preview(task_description),
        });
        tracing::info!(audit = %audit.to_string(), "worker");

        result
    }
}

fn preview(task: &str) -> String {
    if task.chars().count() > TASK_PREVIEW_CHARS {
        format!("{}...", task.chars().take(TASK_PREVIEW_CHARS).collect::<String>())
    } else {
        task.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::workers::{is_error_signal, Worker};

    struct Sleepy(WorkerId, Duration);

    #[async_trait]
    impl Worker for Sleepy {
        fn id(&self) -> WorkerId {
            self.0
        }

        async fn execute(&self, task: &str, _recent: &[ContextEntry]) -> WorkerResult {
            tokio::time::sleep(self.1).await;
            WorkerResult::success("done", format!("done: {task}"))
        }
    }

    struct Bare(WorkerId);

    #[async_trait]
    impl Worker for Bare {
        fn id(&self) -> WorkerId {
            self.0
        }

        async fn execute(&self, _task: &str, _recent: &[ContextEntry]) -> WorkerResult {
            WorkerResult::failure("table already exists")
        }
    }

    fn registry_with(slow: Duration) -> WorkerRegistry {
        let mut registry = WorkerRegistry::new();
        registry.register(Sleepy(WorkerId::Connector, slow));
        registry.register(Sleepy(WorkerId::Transformer, Duration::ZERO));
        registry.register(Bare(WorkerId::Warehouse));
        registry
    }

    #[test]
    fn test_new_rejects_incomplete_registry() {
        let mut registry = WorkerRegistry::new();
        registry.register(Bare(WorkerId::Warehouse));
        assert!(WorkerExecutor::new(registry, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_timeout_becomes_sentinel_failure() {
        let executor =
            WorkerExecutor::new(registry_with(Duration::from_secs(5)), Duration::from_millis(20)).unwrap();
        let result = executor.execute(WorkerId::Connector, "download a.csv", &[]).await;
        assert!(is_error_signal(result.signal_text()));
        assert!(result.signal_text().contains("timed out"));
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let executor =
            WorkerExecutor::new(registry_with(Duration::ZERO), Duration::from_secs(1)).unwrap();
        let result = executor.execute(WorkerId::Transformer, "merge", &[]).await;
        assert_eq!(result, WorkerResult::success("done", "done: merge"));
    }

    #[tokio::test]
    async fn test_failure_reason_gets_sentinel() {
        let executor =
            WorkerExecutor::new(registry_with(Duration::ZERO), Duration::from_secs(1)).unwrap();
        let result = executor.execute(WorkerId::Warehouse, "create table t", &[]).await;
        assert_eq!(result, WorkerResult::failure("ERROR: table already exists"));
    }
}
