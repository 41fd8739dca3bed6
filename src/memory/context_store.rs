//! 上下文日志：单次运行内所有 Worker / Planner / Resolver 决策的只追加记录
//!
//! 只提供 append / all / latest / recent，没有删除或修改接口；
//! Resolver 的证据检索基于 all() 快照，同一日志上的检索结果可复现。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workers::WorkerId;

/// 一次调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Error,
}

/// 产生该条记录的参与者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "worker", rename_all = "snake_case")]
pub enum Actor {
    Worker(WorkerId),
    Planner,
    Resolver,
}

impl Actor {
    /// 若为 Worker 则返回其 id
    pub fn worker(&self) -> Option<WorkerId> {
        match self {
            Actor::Worker(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Worker(id) => write!(f, "{id}"),
            Actor::Planner => write!(f, "planner"),
            Actor::Resolver => write!(f, "resolver"),
        }
    }
}

/// 单条上下文记录；raw_response 原样保留（Resolver 依赖其中的精确参数值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub task_description: String,
    pub actor: Actor,
    pub raw_response: String,
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

impl ContextEntry {
    pub fn success(
        task_description: impl Into<String>,
        actor: Actor,
        raw_response: impl Into<String>,
    ) -> Self {
        Self::new(task_description, actor, raw_response, Outcome::Success)
    }

    pub fn error(
        task_description: impl Into<String>,
        actor: Actor,
        raw_response: impl Into<String>,
    ) -> Self {
        Self::new(task_description, actor, raw_response, Outcome::Error)
    }

    fn new(
        task_description: impl Into<String>,
        actor: Actor,
        raw_response: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            task_description: task_description.into(),
            actor,
            raw_response: raw_response.into(),
            outcome,
            recorded_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }

    /// 检索用文本：任务描述 + 原始回复
    pub fn search_text(&self) -> String {
        format!("{}\n{}", self.task_description, self.raw_response)
    }
}

/// 只追加的上下文日志（run 级别，不跨运行共享）
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ContextStore {
    entries: Vec<ContextEntry>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录，返回其下标
    pub fn append(&mut self, entry: ContextEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn all(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ContextEntry> {
        self.entries.last()
    }

    pub fn get(&self, index: usize) -> Option<&ContextEntry> {
        self.entries.get(index)
    }

    /// 最近 n 条（按时间顺序），供 Worker 作为上下文
    pub fn recent(&self, n: usize) -> &[ContextEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
