//! 规划层：Task Planner 抽象、LLM 实现、回复格式 Schema 与 prompt

pub mod planner;
pub mod prompts;
pub mod schema;

pub use planner::{parse_planner_reply, LlmTaskPlanner, PlanResult, PlannerError, TaskPlanner};
pub use schema::{planner_reply_schema_json, PlannerReply};
