//! Conflict Resolver：Worker 失败后检索证据、推导有依据的修正任务，或判定无法消解
//!
//! decide 是纯函数（只读状态快照），resolve 把决策应用到状态上。决策顺序：
//! 连续消解上限 → Planner 超时回到规划 → 瞬时错误原样重试 → 有依据的改写 → 误派改派 → 终止。
//! 任何检索错误（如空语料）都按无法消解处理，从不向上抛出。
//!
//! 瞬时 / 误派的判断只看错误文本中的普通单词：引号内的字面量和标识符形态的 token
//! （含 `_` `.` `/` `-` `:` 或数字）不参与匹配，标记按整词匹配。

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::events::{send_event, RunEvent};
use crate::core::grounding::{propose_correction, substitute};
use crate::core::{OrchestrationError, WorkflowState};
use crate::memory::tokenizer::tokenize;
use crate::memory::{rank_evidence, Actor, ContextEntry, Evidence, Outcome, RetrievalError};
use crate::workers::WorkerId;

/// 瞬时（非语义）错误：原样重试
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "temporarily unavailable",
    "connection reset",
    "rate limit",
    "rate limited",
    "too many requests",
    "try again",
];

/// 任务派错了 Worker
const MISROUTE_MARKERS: &[&str] = &[
    "not supported",
    "unsupported",
    "cannot handle",
    "not capable",
    "outside my",
    "wrong worker",
    "misrouted",
];

/// Resolver 决策
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// 把（可能改写过的）任务重新派发给 worker
    Retry { task: String, worker: WorkerId, note: String },
    /// 回到规划
    Replan { note: String },
    /// 终止运行
    Abort { error: OrchestrationError, note: String },
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Retry { .. } => "retry",
            Resolution::Replan { .. } => "replan",
            Resolution::Abort { .. } => "abort",
        }
    }
}

/// 改派目标的任务与失败任务至少共享这一比例的词
const MIN_REROUTE_OVERLAP: f32 = 0.5;

fn quoted_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(^|[^\w])(?:'[^'\n]*'|"[^"\n]*"|`[^`\n]*`)"#).expect("static regex")
    })
}

fn is_identifier_like(token: &str) -> bool {
    token
        .chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '_' | '.' | '/' | '-' | ':'))
}

/// 错误文本中的普通单词（小写，空格分隔，首尾各补一个空格）
fn plain_words(detail: &str) -> String {
    let unquoted = quoted_span_regex().replace_all(detail, "$1 ");
    let words: Vec<String> = unquoted
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !(c.is_alphanumeric() || c == '\'')))
        .filter(|t| !t.is_empty() && !is_identifier_like(t))
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

fn mentions_any(detail: &str, markers: &[&str]) -> bool {
    let words = plain_words(detail);
    markers.iter().any(|m| words.contains(&format!(" {m} ")))
}

pub fn is_transient(detail: &str) -> bool {
    mentions_any(detail, TRANSIENT_MARKERS)
}

pub fn is_misroute(detail: &str) -> bool {
    mentions_any(detail, MISROUTE_MARKERS)
}

#[derive(Debug, Clone)]
pub struct ConflictResolver {
    top_k: usize,
    max_consecutive: u32,
}

impl ConflictResolver {
    pub fn new(top_k: usize, max_consecutive: u32) -> Self {
        Self { top_k, max_consecutive }
    }

    /// 失败记录之前的全部日志作为语料，错误详情 + 失败任务作为查询
    pub fn evidence(&self, state: &WorkflowState) -> Result<Vec<Evidence>, RetrievalError> {
        let log = state.context_log().all();
        let corpus = match log.last() {
            Some(last) if last.is_error() => &log[..log.len() - 1],
            _ => log,
        };
        let query = format!("{} {}", state.error_detail(), state.next_task());
        rank_evidence(&query, corpus, self.top_k)
    }

    /// 失败的参与者（最后一条 Error 记录）
    fn failing_actor(state: &WorkflowState) -> Option<Actor> {
        state
            .context_log()
            .latest()
            .filter(|e| e.outcome == Outcome::Error)
            .map(|e| e.actor)
    }

    pub fn decide(&self, state: &WorkflowState) -> Resolution {
        if !state.error_flag() {
            return Resolution::Replan {
                note: "no pending error".to_string(),
            };
        }
        let detail = state.error_detail().to_string();

        if state.consecutive_resolutions() >= self.max_consecutive {
            let note = format!("resolution ceiling ({}) reached", self.max_consecutive);
            return Resolution::Abort {
                error: OrchestrationError::RunAborted {
                    reason: note.clone(),
                    last_error: detail,
                },
                note,
            };
        }

        let worker = match Self::failing_actor(state) {
            Some(Actor::Worker(id)) => id,
            _ => {
                return Resolution::Replan {
                    note: format!("planner step failed, replanning: {detail}"),
                }
            }
        };
        let task = state.next_task().to_string();

        if is_transient(&detail) {
            return Resolution::Retry {
                task,
                worker,
                note: format!("transient failure on {worker}, retrying unchanged"),
            };
        }

        let evidence = match self.evidence(state) {
            Ok(evidence) => evidence,
            Err(e) => {
                return Resolution::Abort {
                    error: OrchestrationError::UnresolvableConflict(detail),
                    note: format!("no evidence: {e}"),
                }
            }
        };
        tracing::debug!(
            run_id = %state.run_id(),
            hits = ?evidence.iter().map(|e| (e.index, e.score)).collect::<Vec<_>>(),
            "evidence ranked"
        );

        let mut sources: Vec<&str> = vec![detail.as_str()];
        for hit in &evidence {
            sources.push(hit.entry.raw_response.as_str());
            sources.push(hit.entry.task_description.as_str());
        }
        sources.push(state.original_request());

        if let Some(fix) = propose_correction(&detail, &task, &sources) {
            return Resolution::Retry {
                task: substitute(&task, &fix.original, &fix.replacement),
                worker,
                note: format!(
                    "replaced '{}' with '{}' (from: {})",
                    fix.original, fix.replacement, fix.source
                ),
            };
        }

        if is_misroute(&detail) {
            return match reroute_target(worker, &task, &evidence) {
                Some(target) => Resolution::Retry {
                    task,
                    worker: target,
                    note: format!("misrouted to {worker}, rerouting to {target}"),
                },
                None => Resolution::Abort {
                    error: OrchestrationError::UnresolvableConflict(detail),
                    note: format!("misroute on {worker} with no other worker succeeding on similar work"),
                },
            };
        }

        Resolution::Abort {
            error: OrchestrationError::UnresolvableConflict(detail),
            note: "no grounded correction in context".to_string(),
        }
    }

    /// 应用决策；每个分支都恰好追加一条 Resolver 记录
    pub fn resolve(&self, state: &mut WorkflowState, events: Option<&UnboundedSender<RunEvent>>) {
        if let Ok(evidence) = self.evidence(state) {
            send_event(
                events,
                RunEvent::EvidenceRetrieved {
                    hits: evidence.iter().map(|e| (e.index, e.score)).collect(),
                },
            );
        }

        let decision = self.decide(state);
        let label = decision.label();
        let note = match decision {
            Resolution::Retry { task, worker, note } => {
                tracing::info!(run_id = %state.run_id(), %worker, task = %task, note = %note, "resolver retry");
                state.record_resolution(task, worker, &note);
                note
            }
            Resolution::Replan { note } => {
                tracing::info!(run_id = %state.run_id(), note = %note, "resolver replan");
                state.return_to_planning(&note);
                note
            }
            Resolution::Abort { error, note } => {
                tracing::warn!(run_id = %state.run_id(), error = %error, note = %note, "resolver abort");
                let entry = ContextEntry::error(
                    state.next_task().to_string(),
                    Actor::Resolver,
                    format!("ERROR: unresolvable: {note}"),
                );
                state.abort(error, Some(entry));
                note
            }
        };
        send_event(
            events,
            RunEvent::Resolved {
                decision: label.to_string(),
                note,
            },
        );
    }
}

/// 失败任务的词中有多少比例出现在 other 里
fn task_overlap(failed_task: &str, other: &str) -> f32 {
    let failed: BTreeSet<String> = tokenize(failed_task).into_iter().collect();
    if failed.is_empty() {
        return 0.0;
    }
    let other: BTreeSet<String> = tokenize(other).into_iter().collect();
    failed.intersection(&other).count() as f32 / failed.len() as f32
}

/// 误派时改派：证据中排名最高的、由其他 Worker 在相似任务上成功的记录
fn reroute_target(failed: WorkerId, failed_task: &str, evidence: &[Evidence]) -> Option<WorkerId> {
    evidence
        .iter()
        .filter(|e| e.entry.outcome == Outcome::Success)
        .filter(|e| task_overlap(failed_task, &e.entry.task_description) >= MIN_REROUTE_OVERLAP)
        .filter_map(|e| e.entry.actor.worker())
        .find(|w| *w != failed)
}
