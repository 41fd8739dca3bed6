//! 编排错误分类
//!
//! WorkerFailure 一律先交给 Conflict Resolver，从不直接返回给调用方；
//! PlannerFailure / UnknownWorker 按 UnresolvableConflict 处理；只有 UnresolvableConflict、RunAborted、Cancelled 会返回给调用方。

use thiserror::Error;

use crate::workers::WorkerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    /// Worker 上报的领域错误（自由文本，带哨兵）
    #[error("worker {worker} failed: {detail}")]
    WorkerFailure { worker: WorkerId, detail: String },

    /// Planner 无法给出合法的 (task, worker)
    #[error("planner failure: {0}")]
    PlannerFailure(String),

    /// Resolver 找不到可在上下文中逐字找到依据的修正
    #[error("unresolvable conflict: {0}")]
    UnresolvableConflict(String),

    /// 步数 / 连续消解次数上限
    #[error("run aborted: {reason}; last error: {last_error}")]
    RunAborted { reason: String, last_error: String },

    /// 调用方在步骤边界取消
    #[error("run aborted: cancelled by caller")]
    Cancelled,

    /// Planner 给出的 Worker 标识无法解析
    #[error("planner chose unknown worker '{0}'")]
    UnknownWorker(String),
}

impl OrchestrationError {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestrationError::UnresolvableConflict(_)
                | OrchestrationError::RunAborted { .. }
                | OrchestrationError::Cancelled
        )
    }

    /// 转为可返回给调用方的终止性错误（PlannerFailure 没有可归咎的 Worker，也没有可改写的证据）
    pub fn into_terminal(self) -> OrchestrationError {
        match self {
            OrchestrationError::PlannerFailure(_)
            | OrchestrationError::UnknownWorker(_)
            | OrchestrationError::WorkerFailure { .. } => {
                OrchestrationError::UnresolvableConflict(self.to_string())
            }
            terminal => terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_failure_becomes_unresolvable() {
        let err = OrchestrationError::PlannerFailure("unknown worker identifier: 'x'".to_string());
        assert!(!err.is_terminal());
        let terminal = err.into_terminal();
        assert!(terminal.is_terminal());
        assert_eq!(
            terminal.to_string(),
            "unresolvable conflict: planner failure: unknown worker identifier: 'x'"
        );
    }

    #[test]
    fn test_unknown_worker_is_not_surfaced_directly() {
        let err = OrchestrationError::UnknownWorker("spark".to_string()).into_terminal();
        assert_eq!(
            err,
            OrchestrationError::UnresolvableConflict("planner chose unknown worker 'spark'".to_string())
        );
        assert!(OrchestrationError::Cancelled.is_terminal());
    }

    #[test]
    fn test_run_aborted_display_carries_last_error() {
        let err = OrchestrationError::RunAborted {
            reason: "step limit (3) reached".to_string(),
            last_error: "ERROR: quota".to_string(),
        };
        assert!(err.to_string().contains("ERROR: quota"));
        assert_eq!(err.clone().into_terminal(), err);
    }
}
