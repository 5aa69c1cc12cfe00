//! In-process backend for tests. Returns a canned reply or a canned failure
//! and remembers every request it received.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse};

pub struct MockBackend {
    reply: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), requests: Mutex::new(Vec::new()) }
    }

    /// A backend whose every call fails with `LlmError::Unavailable`.
    pub fn failing() -> Self {
        Self { reply: None, requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Text of the last prompt sent, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.requests()
            .last()
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let prompt_tokens = req
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum::<usize>();
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(req);
        }
        match &self.reply {
            Some(text) => Ok(LlmResponse {
                content: text.clone(),
                model: "mock".to_string(),
                prompt_tokens: prompt_tokens as u32,
                completion_tokens: text.split_whitespace().count() as u32,
            }),
            None => Err(LlmError::Unavailable("mock backend configured to fail".to_string())),
        }
    }

    fn model_id(&self) -> &str { "mock" }
    fn backend_name(&self) -> &'static str { "mock" }
    fn is_local(&self) -> bool { true }
}
