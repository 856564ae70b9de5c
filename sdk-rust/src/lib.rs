mod client_utils;
mod errors;
mod ext;
pub mod google;
mod language_model;
pub mod openai;
mod opentelemetry;
mod orchestrator;
mod retry;
pub mod sdk_test;
pub mod structured;
mod types;

pub use errors::*;
pub use language_model::LanguageModel;
pub use orchestrator::{CompletionOrchestrator, CompletionOrchestratorBuilder};
pub use retry::RetryPolicy;
pub use types::*;
