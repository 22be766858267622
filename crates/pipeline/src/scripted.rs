//! Scripted LLM client for tests/dev.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatRequest, ChatResponse, Choice, ChoiceMessage, LlmClient, LlmError};

/// Returns queued responses in order and records every request it sees.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response whose content is `value` serialized.
    pub fn push_json(&self, value: Value) {
        self.push_content(&value.to_string());
    }

    /// Queue a successful response with raw string content.
    pub fn push_content(&self, content: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(ChatResponse {
                choices: vec![Choice {
                    message: ChoiceMessage {
                        content: Some(content.to_string()),
                    },
                }],
            }));
    }

    /// Queue a transport/HTTP failure.
    pub fn push_error(&self, err: LlmError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Transport(
                    "scripted client has no queued response".to_string(),
                ))
            })
    }
}
