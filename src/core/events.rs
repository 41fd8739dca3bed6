//! 运行过程事件：用于 CLI / Web 流式展示规划、派发、消解与终止

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::workers::WorkerId;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 运行开始
    Started { run_id: Uuid, request: String },
    /// Planner 选定下一任务
    Planned { step: usize, worker: WorkerId, task: String },
    /// 任务派发给 Worker（含 Resolver 修正后的重试）
    Dispatched { worker: WorkerId, task: String, retry: bool },
    WorkerSucceeded { worker: WorkerId, summary: String },
    WorkerFailed { worker: Option<WorkerId>, detail: String },
    /// Resolver 检索到的证据（日志下标 + 相似度）
    EvidenceRetrieved { hits: Vec<(usize, f32)> },
    /// Resolver 决策（retry / replan / abort）
    Resolved { decision: String, note: String },
    /// 运行结束
    Terminated {
        run_id: Uuid,
        completed: bool,
        final_error: Option<String>,
        steps: usize,
    },
}

pub(crate) fn send_event(tx: Option<&UnboundedSender<RunEvent>>, ev: RunEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}
