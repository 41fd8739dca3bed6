//! 核心编排层：工作流状态、Delegator、Conflict Resolver、主控循环与运行监管

pub mod delegator;
pub mod error;
pub mod events;
pub mod grounding;
pub mod orchestrator;
pub mod resolver;
pub mod state;
pub mod supervisor;

pub use delegator::Delegator;
pub use error::OrchestrationError;
pub use events::RunEvent;
pub use orchestrator::{Orchestrator, RunConfig, RunResult, RunStatus};
pub use resolver::{ConflictResolver, Resolution};
pub use state::{NextWorker, RunPhase, TaskRecord, Termination, WorkflowState};
pub use supervisor::RunSupervisor;
