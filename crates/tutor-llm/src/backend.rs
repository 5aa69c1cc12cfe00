//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   GeminiBackend            Google Gemini `generateContent` (default)
//!   OpenAiCompatibleBackend  any `/v1/chat/completions` endpoint
//!   OllamaBackend            local Ollama through its OpenAI-compatible API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Empty response from model ({0})")]
    EmptyResponse(String),
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Single-turn request carrying one user prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(text)],
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn backend_name(&self) -> &'static str;
    fn is_local(&self) -> bool;
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Timeout used until a backend is given its configured one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn token_count(value: &serde_json::Value) -> u32 {
    value.as_u64().unwrap_or(0) as u32
}

fn parse_openai_response(
    json: &serde_json::Value,
    fallback_model: &str,
) -> Result<LlmResponse, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    if content.is_empty() {
        let reason = json["choices"][0]["finish_reason"].as_str().unwrap_or("no choices");
        return Err(LlmError::EmptyResponse(reason.to_string()));
    }
    Ok(LlmResponse {
        content,
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens: token_count(&json["usage"]["prompt_tokens"]),
        completion_tokens: token_count(&json["usage"]["completion_tokens"]),
    })
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status >= 400 {
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(serde_json::from_str(&text)?)
}

// ── 1. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    pub base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LlmError::Unavailable("GEMINI_API_KEY is not configured".to_string())
        })?;
        let model = req.model.as_deref().unwrap_or(&self.model);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        // System message → systemInstruction
        let system_text = req.messages.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());

        let contents: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": req.max_tokens.unwrap_or(2048),
                "temperature":     req.temperature.unwrap_or(0.7),
            }
        });
        if let Some(sys) = system_text {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": sys }]
            });
        }

        let resp = self.client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;

        let content = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts.iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.is_empty() {
            let reason = json["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| json["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            return Err(LlmError::EmptyResponse(reason.to_string()));
        }

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            prompt_tokens: token_count(&json["usageMetadata"]["promptTokenCount"]),
            completion_tokens: token_count(&json["usageMetadata"]["candidatesTokenCount"]),
        })
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &'static str { "gemini" }
    fn is_local(&self) -> bool { false }
}

// ── 2. OpenAI-Compatible (OpenAI, Groq, OpenRouter, vLLM, LMStudio, …) ──────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k),
            None => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(2048),
            "temperature": req.temperature.unwrap_or(0.7),
        });
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &'static str { "openai_compatible" }
    fn is_local(&self) -> bool { false }
}

// ── 3. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(2048),
            "temperature": req.temperature.unwrap_or(0.7),
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &'static str { "ollama" }
    fn is_local(&self) -> bool { true }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_gemini_backend_is_not_local() {
        let b = GeminiBackend::new(Some("AIza-test".into()), "gemini-2.5-flash").unwrap();
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "gemini-2.5-flash");
        assert_eq!(b.backend_name(), "gemini");
    }

    #[test]
    fn test_ollama_is_local() {
        let b = OllamaBackend::new("http://localhost:11434", "llama3:8b").unwrap();
        assert!(b.is_local());
    }

    #[tokio::test]
    async fn test_gemini_complete_parses_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .query_param("key", "AIza-test")
                .body_includes("Apa itu fotosintesis?");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "Fotosintesis adalah " }, { "text": "proses..." }]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 30 }
            }));
        }).await;

        let backend = GeminiBackend::new(Some("AIza-test".into()), "gemini-2.5-flash")
            .unwrap()
            .with_base_url(server.base_url());
        let resp = backend.complete(LlmRequest::prompt("Apa itu fotosintesis?")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.content, "Fotosintesis adalah proses...");
        assert_eq!(resp.prompt_tokens, 12);
        assert_eq!(resp.completion_tokens, 30);
    }

    #[tokio::test]
    async fn test_gemini_api_error_surfaces_message() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST);
            then.status(403).json_body(json!({
                "error": { "code": 403, "message": "API key not valid" }
            }));
        }).await;

        let backend = GeminiBackend::new(Some("bad".into()), "gemini-2.5-flash")
            .unwrap()
            .with_base_url(server.base_url());
        let err = backend.complete(LlmRequest::prompt("halo")).await.unwrap_err();
        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_gemini_blocked_prompt_is_empty_response() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            }));
        }).await;

        let backend = GeminiBackend::new(Some("k".into()), "gemini-2.5-flash")
            .unwrap()
            .with_base_url(server.base_url());
        let err = backend.complete(LlmRequest::prompt("halo")).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(reason) if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_unavailable() {
        let backend = GeminiBackend::new(None, "gemini-2.5-flash").unwrap();
        let err = backend.complete(LlmRequest::prompt("halo")).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_openai_compatible_sends_bearer_and_parses_choice() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": { "role": "assistant", "content": "Hello!" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 5, "completion_tokens": 2 }
            }));
        }).await;

        let backend =
            OpenAiCompatibleBackend::new(server.base_url(), "gpt-4o-mini", Some("sk-test".into()))
                .unwrap();
        let resp = backend.complete(LlmRequest::prompt("Hi")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.content, "Hello!");
        assert_eq!(resp.model, "gpt-4o-mini");
        assert_eq!(resp.completion_tokens, 2);
    }
}
