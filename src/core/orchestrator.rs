//! 编排器：主控循环
//!
//! 每次 run 创建独立的 WorkflowState，在步数上限与取消令牌约束下反复调用 Delegator::advance，
//! 直到状态进入 Terminal。Orchestrator 本身只读，可通过 Arc 被多个并发运行共享。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::OrchestratorSection;
use crate::core::events::{send_event, RunEvent};
use crate::core::{ConflictResolver, Delegator, OrchestrationError, TaskRecord, Termination, WorkflowState};
use crate::memory::ContextEntry;
use crate::planning::TaskPlanner;
use crate::workers::{WorkerExecutor, WorkerRegistry, WorkerRegistryError};

/// 单次运行参数（显式传入，不读取全局状态）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub max_steps: usize,
    pub max_consecutive_resolutions: u32,
    pub evidence_top_k: usize,
    pub worker_timeout: Duration,
    pub planner_timeout: Duration,
    pub recent_context_entries: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from(&OrchestratorSection::default())
    }
}

impl From<&OrchestratorSection> for RunConfig {
    fn from(section: &OrchestratorSection) -> Self {
        Self {
            max_steps: section.max_steps,
            max_consecutive_resolutions: section.max_consecutive_resolutions,
            evidence_top_k: section.evidence_top_k,
            worker_timeout: Duration::from_secs(section.worker_timeout_secs),
            planner_timeout: Duration::from_secs(section.planner_timeout_secs),
            recent_context_entries: section.recent_context_entries,
        }
    }
}

impl RunConfig {
    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    pub fn with_max_consecutive_resolutions(mut self, n: u32) -> Self {
        self.max_consecutive_resolutions = n;
        self
    }

    pub fn with_evidence_top_k(mut self, k: usize) -> Self {
        self.evidence_top_k = k;
        self
    }

    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    pub fn with_planner_timeout(mut self, timeout: Duration) -> Self {
        self.planner_timeout = timeout;
        self
    }

    pub fn with_recent_context_entries(mut self, n: usize) -> Self {
        self.recent_context_entries = n;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// 运行结果；aborted 时 final_error 携带最后的错误详情
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub completed_tasks: Vec<TaskRecord>,
    pub final_error: Option<String>,
    /// 执行的步数
    pub steps: usize,
    pub context_log: Vec<ContextEntry>,
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

pub struct Orchestrator {
    delegator: Delegator,
    executor: Arc<WorkerExecutor>,
    config: RunConfig,
}

impl Orchestrator {
    /// registry 必须覆盖全部 WorkerId
    pub fn new(
        planner: Arc<dyn TaskPlanner>,
        registry: WorkerRegistry,
        config: RunConfig,
    ) -> Result<Self, WorkerRegistryError> {
        let executor = Arc::new(WorkerExecutor::new(registry, config.worker_timeout)?);
        let resolver = ConflictResolver::new(config.evidence_top_k, config.max_consecutive_resolutions);
        let delegator = Delegator::new(
            planner,
            Arc::clone(&executor),
            resolver,
            config.planner_timeout,
            config.recent_context_entries,
        );
        Ok(Self {
            delegator,
            executor,
            config,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 单 Worker 直接调用（HTTP /workers/:worker 使用）
    pub fn executor(&self) -> &Arc<WorkerExecutor> {
        &self.executor
    }

    pub async fn run(&self, original_request: &str) -> RunResult {
        self.run_with_events(original_request, CancellationToken::new(), None)
            .await
    }

    pub async fn run_with_cancel(&self, original_request: &str, cancel: CancellationToken) -> RunResult {
        self.run_with_events(original_request, cancel, None).await
    }

    /// 主循环：每步检查取消与步数上限，然后推进一步
    pub async fn run_with_events(
        &self,
        original_request: &str,
        cancel: CancellationToken,
        events: Option<UnboundedSender<RunEvent>>,
    ) -> RunResult {
        let events = events.as_ref();
        let mut state = WorkflowState::new(original_request);
        tracing::info!(run_id = %state.run_id(), request = %original_request, "run started");
        send_event(
            events,
            RunEvent::Started {
                run_id: state.run_id(),
                request: original_request.to_string(),
            },
        );

        let mut steps = 0usize;
        while !state.is_terminal() {
            if cancel.is_cancelled() {
                tracing::warn!(run_id = %state.run_id(), steps, "run cancelled");
                state.abort(OrchestrationError::Cancelled, None);
                break;
            }
            if steps >= self.config.max_steps {
                let error = OrchestrationError::RunAborted {
                    reason: format!("step limit ({}) reached", self.config.max_steps),
                    last_error: state.last_error_detail(),
                };
                tracing::warn!(run_id = %state.run_id(), "{error}");
                state.abort(error, None);
                break;
            }

            let before = state.context_log().len();
            self.delegator.advance(&mut state, events).await;
            steps += 1;
            debug_assert!(state.context_log().len() > before, "step appended no context entry");
        }

        let result = Self::finish(state, steps);
        tracing::info!(
            run_id = %result.run_id,
            status = ?result.status,
            tasks = result.completed_tasks.len(),
            steps,
            "run finished"
        );
        send_event(
            events,
            RunEvent::Terminated {
                run_id: result.run_id,
                completed: result.is_completed(),
                final_error: result.final_error.clone(),
                steps,
            },
        );
        result
    }

    fn finish(state: WorkflowState, steps: usize) -> RunResult {
        let (run_id, completed_tasks, context_log, termination) = state.into_parts();
        let (status, final_error) = match termination {
            Some(Termination::Completed) => (RunStatus::Completed, None),
            Some(Termination::Aborted(err)) => (RunStatus::Aborted, Some(err.to_string())),
            None => (RunStatus::Aborted, Some("run ended without termination".to_string())),
        };
        RunResult {
            run_id,
            status,
            completed_tasks,
            final_error,
            steps,
            context_log: context_log.all().to_vec(),
        }
    }
}
