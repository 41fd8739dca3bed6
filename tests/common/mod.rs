//! 集成测试共用的脚本化 Planner / Worker

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use conductor::core::TaskRecord;
use conductor::memory::ContextEntry;
use conductor::planning::{PlanResult, PlannerError, TaskPlanner};
use conductor::workers::{Worker, WorkerId, WorkerRegistry, WorkerResult};
use conductor::{Orchestrator, RunConfig};

/// Planner 脚本的一步
#[derive(Debug, Clone)]
pub enum PlanStep {
    Dispatch(&'static str, &'static str),
    Done,
    Fail(PlannerError),
    /// 一直不返回（触发 Planner 超时）
    Hang,
}

/// 按脚本依次返回；脚本耗尽后回复 done
#[derive(Default)]
pub struct ScriptedPlanner {
    steps: Mutex<VecDeque<PlanStep>>,
    /// 每次调用时看到的 completed_tasks 条数
    seen: Mutex<Vec<usize>>,
    repeat_last: bool,
}

impl ScriptedPlanner {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    /// 脚本只剩最后一步时不再弹出，一直重复
    pub fn repeating(step: PlanStep) -> Self {
        Self {
            steps: Mutex::new(VecDeque::from([step])),
            repeat_last: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen_completed(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }

    fn next_step(&self) -> PlanStep {
        let mut steps = self.steps.lock().unwrap();
        if self.repeat_last && steps.len() == 1 {
            return steps[0].clone();
        }
        steps.pop_front().unwrap_or(PlanStep::Done)
    }
}

#[async_trait]
impl TaskPlanner for ScriptedPlanner {
    async fn plan(
        &self,
        _original_request: &str,
        completed_tasks: &[TaskRecord],
    ) -> Result<PlanResult, PlannerError> {
        self.seen.lock().unwrap().push(completed_tasks.len());
        match self.next_step() {
            PlanStep::Dispatch(task, worker) => Ok(PlanResult::dispatch(task, worker)),
            PlanStep::Done => Ok(PlanResult::done()),
            PlanStep::Fail(e) => Err(e),
            PlanStep::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(PlanResult::done())
            }
        }
    }
}

/// 无状态 Planner：没有已完成任务时把整个请求派给 connector，否则 done
pub struct EchoPlanner;

#[async_trait]
impl TaskPlanner for EchoPlanner {
    async fn plan(
        &self,
        original_request: &str,
        completed_tasks: &[TaskRecord],
    ) -> Result<PlanResult, PlannerError> {
        tokio::task::yield_now().await;
        if completed_tasks.is_empty() {
            Ok(PlanResult::dispatch(original_request, "connector"))
        } else {
            Ok(PlanResult::done())
        }
    }
}

/// 按队列依次回复；队列耗尽后使用 fallback
pub struct ScriptedWorker {
    id: WorkerId,
    replies: Mutex<VecDeque<WorkerResult>>,
    fallback: WorkerResult,
    tasks: Mutex<Vec<String>>,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedWorker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            replies: Mutex::new(VecDeque::new()),
            fallback: WorkerResult::success("ok", format!("{id} ok")),
            tasks: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    pub fn with_replies(self, replies: Vec<WorkerResult>) -> Self {
        *self.replies.lock().unwrap() = replies.into();
        self
    }

    pub fn with_fallback(mut self, fallback: WorkerResult) -> Self {
        self.fallback = fallback;
        self
    }

    /// 被调用时取消该 token（模拟运行中途的外部取消）
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn tasks(&self) -> Vec<String> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn execute(&self, task_description: &str, _recent_context: &[ContextEntry]) -> WorkerResult {
        self.tasks.lock().unwrap().push(task_description.to_string());
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// 一组脚本化 Worker
pub struct Workers {
    pub connector: Arc<ScriptedWorker>,
    pub transformer: Arc<ScriptedWorker>,
    pub warehouse: Arc<ScriptedWorker>,
}

impl Default for Workers {
    fn default() -> Self {
        Self {
            connector: Arc::new(ScriptedWorker::new(WorkerId::Connector)),
            transformer: Arc::new(ScriptedWorker::new(WorkerId::Transformer)),
            warehouse: Arc::new(ScriptedWorker::new(WorkerId::Warehouse)),
        }
    }
}

impl Workers {
    pub fn registry(&self) -> WorkerRegistry {
        let mut registry = WorkerRegistry::new();
        registry.register_arc(self.connector.clone());
        registry.register_arc(self.transformer.clone());
        registry.register_arc(self.warehouse.clone());
        registry
    }
}

pub fn test_config() -> RunConfig {
    RunConfig::default()
        .with_worker_timeout(Duration::from_secs(2))
        .with_planner_timeout(Duration::from_secs(2))
}

pub fn orchestrator(planner: Arc<dyn TaskPlanner>, workers: &Workers, config: RunConfig) -> Orchestrator {
    Orchestrator::new(planner, workers.registry(), config).expect("complete registry")
}

pub fn ok(raw: &str) -> WorkerResult {
    WorkerResult::success(raw, raw)
}

pub fn err(reason: &str) -> WorkerResult {
    WorkerResult::failure(reason)
}
