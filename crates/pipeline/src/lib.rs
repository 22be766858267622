//! `veritor-pipeline` — the six-stage chain-of-reasoning pipeline.
//!
//! Stages are strictly sequential (each consumes validated outputs of its
//! predecessors) and there are no retries: any stage failure fails the job.

pub mod llm;
pub mod runner;
pub mod scripted;
pub mod stages;

pub use llm::{
    AzureOpenAiClient, ChatMessage, ChatRequest, ChatResponse, Choice, ChoiceMessage, LlmClient,
    LlmConfig, LlmError, ResponseFormat,
};
pub use runner::{run_pipeline, StageError};
pub use scripted::ScriptedLlm;
