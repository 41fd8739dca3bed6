//! Worker 层：标识、结果与哨兵约定、注册表、带超时的执行器、LLM Worker

pub mod executor;
pub mod id;
pub mod llm_worker;
pub mod prompts;
pub mod registry;
pub mod result;

pub use executor::WorkerExecutor;
pub use id::{UnknownWorker, WorkerId};
pub use llm_worker::LlmWorker;
pub use registry::{Worker, WorkerRegistry, WorkerRegistryError};
pub use result::{is_error_signal, with_sentinel, WorkerResult, ERROR_SENTINEL};
