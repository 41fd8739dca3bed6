//! Delegator：每一步的路由决策
//!
//! advance(state) 按状态分流：有错误交给 Resolver；有待派发的修正任务直接派发；否则调用 Planner。
//! Planner 每一步都重新调用，不缓存任何跨步结果。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

use crate::core::events::{send_event, RunEvent};
use crate::core::state::PLAN_TASK;
use crate::core::{ConflictResolver, OrchestrationError, WorkflowState};
use crate::memory::{Actor, ContextEntry};
use crate::planning::TaskPlanner;
use crate::workers::{is_error_signal, WorkerExecutor, WorkerId, WorkerResult};

pub struct Delegator {
    planner: Arc<dyn TaskPlanner>,
    executor: Arc<WorkerExecutor>,
    resolver: ConflictResolver,
    planner_timeout: Duration,
    recent_context_entries: usize,
}

impl Delegator {
    pub fn new(
        planner: Arc<dyn TaskPlanner>,
        executor: Arc<WorkerExecutor>,
        resolver: ConflictResolver,
        planner_timeout: Duration,
        recent_context_entries: usize,
    ) -> Self {
        Self {
            planner,
            executor,
            resolver,
            planner_timeout,
            recent_context_entries,
        }
    }

    /// 推进一步；每一步都至少追加一条上下文记录
    pub async fn advance(&self, state: &mut WorkflowState, events: Option<&UnboundedSender<RunEvent>>) {
        if state.is_terminal() {
            return;
        }

        if state.error_flag() {
            self.resolver.resolve(state, events);
            return;
        }

        if state.pending_retry() {
            if let Some(worker) = state.next_worker_id() {
                let task = state.next_task().to_string();
                self.dispatch(state, worker, task, true, events).await;
                return;
            }
        }

        self.plan_and_dispatch(state, events).await;
    }

    async fn plan_and_dispatch(&self, state: &mut WorkflowState, events: Option<&UnboundedSender<RunEvent>>) {
        let planned = timeout(
            self.planner_timeout,
            self.planner.plan(state.original_request(), state.completed_tasks()),
        )
        .await;

        let plan = match planned {
            Err(_) => {
                let detail = format!(
                    "ERROR: task planner timed out after {}s",
                    self.planner_timeout.as_secs_f32()
                );
                tracing::warn!(run_id = %state.run_id(), "{detail}");
                send_event(events, RunEvent::WorkerFailed { worker: None, detail: detail.clone() });
                state.record_failure(Actor::Planner, PLAN_TASK, &detail);
                return;
            }
            Ok(Err(e)) => {
                self.abort_planner(state, OrchestrationError::PlannerFailure(e.to_string()));
                return;
            }
            Ok(Ok(plan)) => plan,
        };

        if plan.done {
            tracing::info!(run_id = %state.run_id(), tasks = state.completed_tasks().len(), "request satisfied");
            state.complete("request satisfied");
            return;
        }

        let worker = match plan.worker.parse::<WorkerId>() {
            Ok(worker) => worker,
            Err(_) => {
                self.abort_planner(state, OrchestrationError::UnknownWorker(plan.worker));
                return;
            }
        };
        let task = plan.task.trim().to_string();
        if task.is_empty() {
            self.abort_planner(
                state,
                OrchestrationError::PlannerFailure(format!("empty task for worker '{worker}'")),
            );
            return;
        }

        send_event(
            events,
            RunEvent::Planned {
                step: state.context_log().len(),
                worker,
                task: task.clone(),
            },
        );
        state.route(task.clone(), worker);
        self.dispatch(state, worker, task, false, events).await;
    }

    fn abort_planner(&self, state: &mut WorkflowState, error: OrchestrationError) {
        tracing::warn!(run_id = %state.run_id(), error = %error, "planner failure");
        let entry = ContextEntry::error(PLAN_TASK, Actor::Planner, format!("ERROR: {error}"));
        state.abort(error, Some(entry));
    }

    async fn dispatch(
        &self,
        state: &mut WorkflowState,
        worker: WorkerId,
        task: String,
        retry: bool,
        events: Option<&UnboundedSender<RunEvent>>,
    ) {
        tracing::info!(run_id = %state.run_id(), %worker, retry, task = %task, "dispatch");
        send_event(events, RunEvent::Dispatched { worker, task: task.clone(), retry });

        let recent = state.context_log().recent(self.recent_context_entries).to_vec();
        let result = self.executor.execute(worker, &task, &recent).await;

        match result {
            WorkerResult::Success { summary, raw_output } if !is_error_signal(&raw_output) => {
                send_event(
                    events,
                    RunEvent::WorkerSucceeded {
                        worker,
                        summary: summary.clone(),
                    },
                );
                state.record_success(worker, &task, summary, raw_output);
            }
            other => {
                let failure = OrchestrationError::WorkerFailure {
                    worker,
                    detail: other.signal_text().to_string(),
                };
                tracing::warn!(run_id = %state.run_id(), "{failure}");
                send_event(
                    events,
                    RunEvent::WorkerFailed {
                        worker: Some(worker),
                        detail: other.signal_text().to_string(),
                    },
                );
                state.record_failure(Actor::Worker(worker), &task, other.signal_text());
            }
        }
    }
}
