//! 运行监管：取消管理
//!
//! 持有根 CancellationToken；Ctrl+C 或 HTTP 服务关闭时取消，所有运行在下一个步骤边界终止。
//! 每次运行使用子 token，可单独取消而不影响其他运行。

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct RunSupervisor {
    cancel_token: CancellationToken,
}

impl RunSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 创建子 token（用于单次运行）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// 收到 Ctrl+C 时取消全部运行
    pub fn cancel_on_ctrl_c(&self) {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling runs at next step boundary");
                token.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_children() {
        let supervisor = RunSupervisor::new();
        let child = supervisor.child_token();
        assert!(!child.is_cancelled());
        supervisor.cancel_token().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_child_cancel_is_isolated() {
        let supervisor = RunSupervisor::new();
        let a = supervisor.child_token();
        let b = supervisor.child_token();
        a.cancel();
        assert!(!b.is_cancelled());
        assert!(!supervisor.cancel_token().is_cancelled());
    }
}
