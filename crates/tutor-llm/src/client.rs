//! Configured entry point used by the RAG engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tutor_config::{LlmConfig, LlmProvider};

use crate::audit::LlmAuditEntry;
use crate::backend::{
    GeminiBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, OllamaBackend,
    OpenAiCompatibleBackend,
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Wraps one backend with the configured sampling settings and audits every call.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn LlmBackend>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn LlmBackend>, temperature: f32, max_tokens: u32) -> Self {
        Self { backend, temperature, max_tokens }
    }

    /// Build the backend named by `llm.provider`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let backend: Arc<dyn LlmBackend> = match config.provider {
            LlmProvider::Gemini => {
                let mut backend = GeminiBackend::new(config.api_key.clone(), &config.model)?
                    .with_timeout(timeout)?;
                if let Some(url) = &config.base_url {
                    backend = backend.with_base_url(url);
                }
                Arc::new(backend)
            }
            LlmProvider::OpenaiCompatible => Arc::new(
                OpenAiCompatibleBackend::new(
                    config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL),
                    &config.model,
                    config.api_key.clone(),
                )?
                .with_timeout(timeout)?,
            ),
            LlmProvider::Ollama => Arc::new(
                OllamaBackend::new(
                    config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
                    &config.model,
                )?
                .with_timeout(timeout)?,
            ),
        };
        tracing::info!(
            backend = backend.backend_name(),
            model = backend.model_id(),
            is_local = backend.is_local(),
            "LLM backend configured"
        );
        Ok(Self::new(backend, config.temperature, config.max_output_tokens))
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// Send a single prompt and return the model's reply.
    pub async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let mut req = LlmRequest::prompt(prompt);
        req.temperature = Some(self.temperature);
        req.max_tokens = Some(self.max_tokens);

        let started = Instant::now();
        let result = self.backend.complete(req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(resp) => LlmAuditEntry::new(
                resp.model.clone(),
                self.backend.backend_name().to_string(),
                prompt.chars().count(),
                resp.prompt_tokens,
                resp.completion_tokens,
                &resp.content,
                latency_ms,
            )
            .record(),
            Err(e) => tracing::warn!(
                backend = self.backend.backend_name(),
                model = self.backend.model_id(),
                latency_ms,
                error = %e,
                "LLM call failed"
            ),
        }
        result
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("backend", &self.backend.backend_name())
            .field("model", &self.backend.model_id())
            .finish()
    }
}
