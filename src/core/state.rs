//! 工作流状态：每次运行唯一的可变记录，贯穿 Delegator / Worker / Resolver 的每一步
//!
//! 字段只能通过本模块的转移方法修改，由这些方法维护以下约束：
//! - error_flag 为真时 error_detail 非空，且日志最后一条为 Error；
//! - 每个 TaskRecord 通过 context_index 对应唯一一条 Success 记录；
//! - 进入 Terminal 后不再有任何修改；
//! - 每次转移都恰好追加一条日志（终止与取消除外）。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::OrchestrationError;
use crate::memory::{Actor, ContextEntry, ContextStore};
use crate::workers::{with_sentinel, WorkerId};

/// Planner 与回到规划时记录使用的任务描述
pub(crate) const PLAN_TASK: &str = "plan next task";

/// 下一步路由目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "worker", rename_all = "snake_case")]
pub enum NextWorker {
    /// 尚未规划
    Unresolved,
    Worker(WorkerId),
    Resolver,
    /// 唯一的终止标记
    Terminal,
}

impl fmt::Display for NextWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextWorker::Unresolved => write!(f, "unresolved"),
            NextWorker::Worker(id) => write!(f, "{id}"),
            NextWorker::Resolver => write!(f, "resolver"),
            NextWorker::Terminal => write!(f, "none"),
        }
    }
}

/// 状态机阶段：PLANNING → DISPATCHED → PLANNING | RESOLVING → PLANNING | TERMINAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    /// Resolver 的修正任务待派发
    Dispatched,
    Resolving,
    Terminal,
}

/// 已完成任务，追加后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub description: String,
    pub worker: WorkerId,
    pub result_summary: String,
    /// 对应的 Success 日志下标
    pub context_index: usize,
}

/// 运行结束方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Aborted(OrchestrationError),
}

#[derive(Debug)]
pub struct WorkflowState {
    run_id: Uuid,
    original_request: String,
    completed_tasks: Vec<TaskRecord>,
    context_log: ContextStore,
    next_worker: NextWorker,
    next_task: String,
    error_flag: bool,
    error_detail: String,
    consecutive_resolutions: u32,
    pending_retry: bool,
    termination: Option<Termination>,
}

impl WorkflowState {
    pub fn new(original_request: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            original_request: original_request.into(),
            completed_tasks: Vec::new(),
            context_log: ContextStore::new(),
            next_worker: NextWorker::Unresolved,
            next_task: String::new(),
            error_flag: false,
            error_detail: String::new(),
            consecutive_resolutions: 0,
            pending_retry: false,
            termination: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn original_request(&self) -> &str {
        &self.original_request
    }

    pub fn completed_tasks(&self) -> &[TaskRecord] {
        &self.completed_tasks
    }

    pub fn context_log(&self) -> &ContextStore {
        &self.context_log
    }

    pub fn next_worker(&self) -> NextWorker {
        self.next_worker
    }

    pub fn next_worker_id(&self) -> Option<WorkerId> {
        match self.next_worker {
            NextWorker::Worker(id) => Some(id),
            _ => None,
        }
    }

    pub fn next_task(&self) -> &str {
        &self.next_task
    }

    pub fn error_flag(&self) -> bool {
        self.error_flag
    }

    pub fn error_detail(&self) -> &str {
        &self.error_detail
    }

    pub fn consecutive_resolutions(&self) -> u32 {
        self.consecutive_resolutions
    }

    /// Resolver 已准备好修正后的任务，Delegator 需先派发它再重新规划
    pub fn pending_retry(&self) -> bool {
        self.pending_retry
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.next_worker == NextWorker::Terminal
    }

    pub fn phase(&self) -> RunPhase {
        if self.is_terminal() {
            RunPhase::Terminal
        } else if self.error_flag {
            RunPhase::Resolving
        } else if self.pending_retry {
            RunPhase::Dispatched
        } else {
            RunPhase::Planning
        }
    }

    /// 进入 Terminal 后拒绝一切修改
    fn guard(&self, transition: &str) -> bool {
        if self.is_terminal() {
            tracing::warn!(run_id = %self.run_id, transition, "ignored mutation of terminal state");
            false
        } else {
            true
        }
    }

    /// Delegator 选定下一任务与 Worker
    pub(crate) fn route(&mut self, task: impl Into<String>, worker: WorkerId) {
        if !self.guard("route") {
            return;
        }
        self.next_task = task.into();
        self.next_worker = NextWorker::Worker(worker);
    }

    /// Worker 成功：追加 Success 记录与 TaskRecord，清除错误，重置连续消解计数
    pub(crate) fn record_success(
        &mut self,
        worker: WorkerId,
        task: &str,
        summary: impl Into<String>,
        raw_output: impl Into<String>,
    ) {
        if !self.guard("record_success") {
            return;
        }
        let index = self
            .context_log
            .append(ContextEntry::success(task, Actor::Worker(worker), raw_output));
        self.completed_tasks.push(TaskRecord {
            description: task.to_string(),
            worker,
            result_summary: summary.into(),
            context_index: index,
        });
        self.error_flag = false;
        self.error_detail.clear();
        self.consecutive_resolutions = 0;
        self.pending_retry = false;
    }

    /// Worker（或 Planner 超时）失败：追加 Error 记录并置错误标志，下一步交给 Resolver
    pub(crate) fn record_failure(&mut self, actor: Actor, task: &str, detail: &str) {
        if !self.guard("record_failure") {
            return;
        }
        let detail = with_sentinel(detail);
        self.context_log
            .append(ContextEntry::error(task, actor, detail.clone()));
        self.error_flag = true;
        self.error_detail = detail;
        self.next_worker = NextWorker::Resolver;
        self.pending_retry = false;
    }

    /// Resolver 给出修正任务：追加消解记录，清除错误，交回 Delegator 派发
    pub(crate) fn record_resolution(&mut self, task: impl Into<String>, worker: WorkerId, note: &str) {
        if !self.guard("record_resolution") {
            return;
        }
        let task = task.into();
        self.context_log
            .append(ContextEntry::success(task.clone(), Actor::Resolver, note));
        self.next_task = task;
        self.next_worker = NextWorker::Worker(worker);
        self.error_flag = false;
        self.error_detail.clear();
        self.consecutive_resolutions += 1;
        self.pending_retry = true;
    }

    /// Resolver 决定回到规划（如 Planner 超时）
    pub(crate) fn return_to_planning(&mut self, note: &str) {
        if !self.guard("return_to_planning") {
            return;
        }
        self.context_log
            .append(ContextEntry::success(PLAN_TASK, Actor::Resolver, note));
        self.next_worker = NextWorker::Unresolved;
        self.error_flag = false;
        self.error_detail.clear();
        self.consecutive_resolutions += 1;
        self.pending_retry = false;
    }

    /// Planner 判定请求已满足
    pub(crate) fn complete(&mut self, note: &str) {
        if !self.guard("complete") {
            return;
        }
        self.context_log
            .append(ContextEntry::success(PLAN_TASK, Actor::Planner, note));
        self.next_worker = NextWorker::Terminal;
        self.pending_retry = false;
        self.termination = Some(Termination::Completed);
    }

    /// 以错误终止；entry 为失败决策的日志记录（取消等边界终止时为 None）
    pub(crate) fn abort(&mut self, error: OrchestrationError, entry: Option<ContextEntry>) {
        if !self.guard("abort") {
            return;
        }
        if let Some(entry) = entry {
            self.context_log.append(entry);
        }
        self.next_worker = NextWorker::Terminal;
        self.pending_retry = false;
        self.termination = Some(Termination::Aborted(error.into_terminal()));
    }

    /// 最后一次失败的详情（终止时作为诊断文本）
    pub fn last_error_detail(&self) -> String {
        if !self.error_detail.is_empty() {
            return self.error_detail.clone();
        }
        self.context_log
            .all()
            .iter()
            .rev()
            .find(|e| e.is_error())
            .map(|e| e.raw_response.clone())
            .unwrap_or_default()
    }

    pub(crate) fn into_parts(self) -> (Uuid, Vec<TaskRecord>, ContextStore, Option<Termination>) {
        (self.run_id, self.completed_tasks, self.context_log, self.termination)
    }
}
