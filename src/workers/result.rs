//! Worker 返回值与错误哨兵约定
//!
//! 任何 Worker 上报的文本错误都以固定哨兵 `ERROR:` 开头；Delegator 只看哨兵判定失败，
//! 与 Worker 内部的错误类型无关。

use serde::Serialize;

/// 错误哨兵
pub const ERROR_SENTINEL: &str = "ERROR:";

/// 摘要最大字符数
const SUMMARY_MAX_CHARS: usize = 200;

/// 文本是否以哨兵开头（忽略前导空白与大小写）
pub fn is_error_signal(text: &str) -> bool {
    text.trim_start()
        .get(..ERROR_SENTINEL.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ERROR_SENTINEL))
}

/// 确保文本带哨兵前缀
pub fn with_sentinel(reason: &str) -> String {
    let reason = reason.trim();
    if is_error_signal(reason) {
        reason.to_string()
    } else if reason.is_empty() {
        format!("{ERROR_SENTINEL} unspecified worker failure")
    } else {
        format!("{ERROR_SENTINEL} {reason}")
    }
}

/// Worker 执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResult {
    Success { summary: String, raw_output: String },
    Failure { reason: String },
}

impl WorkerResult {
    pub fn success(summary: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self::Success {
            summary: summary.into(),
            raw_output: raw_output.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// 按哨兵对自由文本回复分类（LLM Worker 使用）
    pub fn from_reply(reply: &str) -> Self {
        if is_error_signal(reply) {
            Self::failure(reply.trim())
        } else {
            Self::success(summarize(reply), reply)
        }
    }

    /// 统一哨兵约定：以哨兵开头的 Success 视为失败；Failure 的 reason 一律带哨兵
    pub fn normalized(self) -> Self {
        match self {
            Self::Success { raw_output, .. } if is_error_signal(&raw_output) => {
                Self::failure(raw_output.trim())
            }
            Self::Failure { reason } => Self::failure(with_sentinel(&reason)),
            ok => ok,
        }
    }

    /// 用于哨兵检测与写入日志的原始文本
    pub fn signal_text(&self) -> &str {
        match self {
            Self::Success { raw_output, .. } => raw_output,
            Self::Failure { reason } => reason,
        }
    }
}

/// 取首个非空行并截断
fn summarize(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", line.chars().take(SUMMARY_MAX_CHARS).collect::<String>())
    } else {
        line.to_string()
    }
}
