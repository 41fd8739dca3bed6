//! 记忆层：本次运行的上下文日志（只追加）、分词、基于 TF-IDF 的证据检索

pub mod context_store;
pub mod retrieval;
pub mod tokenizer;

pub use context_store::{Actor, ContextEntry, ContextStore, Outcome};
pub use retrieval::{rank_evidence, Evidence, RetrievalError, TfIdfModel};
