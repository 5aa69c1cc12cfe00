//! Retrieval-augmented answer generation.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument};
use tutor_config::{IndexerConfig, LlmConfig};
use tutor_llm::LlmClient;

use crate::error::RagError;
use crate::indexer::{IndexerClient, RetrievedChunk};
use crate::language::{detect_language, Language};
use crate::prompt::{build_direct_prompt, build_prompt, ChatTurn};

const PREVIEW_CHARS: usize = 150;

/// A chunk that informed an answer, as stored with the chat and shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub chunk_id: i64,
    pub document_id: i64,
    pub similarity: f64,
    pub preview: String,
}

impl From<&RetrievedChunk> for Source {
    fn from(chunk: &RetrievedChunk) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            document_id: chunk.document_id,
            similarity: chunk.similarity,
            preview: preview(&chunk.content),
        }
    }
}

/// First `PREVIEW_CHARS` characters followed by an ellipsis.
pub fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub reply: String,
    pub language: Language,
    pub sources: Vec<Source>,
    pub context_used: bool,
    pub history_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectAnswer {
    pub reply: String,
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct RagEngine {
    llm: LlmClient,
    indexer: IndexerClient,
    top_k: usize,
}

impl RagEngine {
    pub fn new(llm: LlmClient, indexer: IndexerClient, top_k: usize) -> Self {
        Self { llm, indexer, top_k }
    }

    pub fn from_config(llm: &LlmConfig, indexer: &IndexerConfig) -> Result<Self, RagError> {
        Ok(Self::new(
            LlmClient::from_config(llm)?,
            IndexerClient::new(&indexer.url, Duration::from_secs(indexer.timeout_secs))?,
            indexer.top_k,
        ))
    }

    pub fn indexer(&self) -> &IndexerClient {
        &self.indexer
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// Answer `message` using document context and earlier turns.
    ///
    /// When `context` is `None` the indexer is queried; an unreachable indexer
    /// just means no context. Only the LLM call can fail.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn generate_response(
        &self,
        message: &str,
        context: Option<Vec<RetrievedChunk>>,
        history: &[ChatTurn],
    ) -> Result<RagAnswer, RagError> {
        let language = detect_language(message);

        let context = match context {
            Some(chunks) => chunks,
            None => self.indexer.retrieve(message, self.top_k).await,
        };

        let prompt = build_prompt(message, &context, language, history);
        let response = self.llm.generate(&prompt).await?;

        info!(
            language = language.code(),
            chunks = context.len(),
            "RAG response generated"
        );

        Ok(RagAnswer {
            reply: response.content,
            language,
            sources: context.iter().map(Source::from).collect(),
            context_used: !context.is_empty(),
            history_used: !history.is_empty(),
        })
    }

    /// Answer without retrieval or history.
    pub async fn generate_direct_response(&self, message: &str) -> Result<DirectAnswer, RagError> {
        let language = detect_language(message);
        let prompt = build_direct_prompt(message, language);
        let response = self.llm.generate(&prompt).await?;
        Ok(DirectAnswer { reply: response.content, language })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use tutor_llm::mock::MockBackend;

    fn engine(mock: Arc<MockBackend>, indexer_url: &str) -> RagEngine {
        RagEngine::new(
            LlmClient::new(mock, 0.7, 2048),
            IndexerClient::new(indexer_url, Duration::from_secs(5)).unwrap(),
            5,
        )
    }

    #[test]
    fn test_from_config_builds_clients() {
        let indexer =
            IndexerConfig { url: "http://indexer:8000/".to_string(), ..Default::default() };
        let engine = RagEngine::from_config(&LlmConfig::default(), &indexer).unwrap();
        assert_eq!(engine.indexer().base_url(), "http://indexer:8000");
        assert_eq!(engine.llm().model_id(), "gemini-2.5-flash");
    }

    #[test]
    fn test_preview_is_char_safe() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("pendek"), "pendek...");
    }

    #[tokio::test]
    async fn test_generate_response_uses_retrieved_context() {
        let server = MockServer::start_async().await;
        let retrieve = server.mock_async(|when, then| {
            when.method(POST).path("/retrieve").json_body(json!({
                "query": "Apa itu mitokondria?", "top_k": 5
            }));
            then.status(200).json_body(json!({
                "success": true,
                "query": "Apa itu mitokondria?",
                "results": [{
                    "chunk_id": 11, "document_id": 4, "chunk_index": 2,
                    "content": "Mitokondria adalah organel penghasil energi.",
                    "similarity": 0.87
                }]
            }));
        }).await;

        let mock = Arc::new(MockBackend::replying("Mitokondria adalah pembangkit energi sel."));
        let answer = engine(mock.clone(), &server.base_url())
            .generate_response("Apa itu mitokondria?", None, &[])
            .await
            .unwrap();

        retrieve.assert_async().await;
        assert_eq!(answer.reply, "Mitokondria adalah pembangkit energi sel.");
        assert_eq!(answer.language, Language::Indonesian);
        assert!(answer.context_used);
        assert!(!answer.history_used);
        assert_eq!(answer.sources, vec![Source {
            chunk_id: 11,
            document_id: 4,
            similarity: 0.87,
            preview: "Mitokondria adalah organel penghasil energi....".to_string(),
        }]);

        let prompt = mock.last_prompt().unwrap();
        assert!(prompt.contains("[1] Mitokondria adalah organel penghasil energi."));
    }

    #[tokio::test]
    async fn test_provided_context_skips_indexer() {
        let server = MockServer::start_async().await;
        let retrieve = server.mock_async(|when, then| {
            when.method(POST).path("/retrieve");
            then.status(200).json_body(json!({ "success": true, "query": "", "results": [] }));
        }).await;

        let mock = Arc::new(MockBackend::replying("ok"));
        let history = [ChatTurn::new("What is DNA?", "A molecule.")];
        let answer = engine(mock.clone(), &server.base_url())
            .generate_response("And what about RNA?", Some(Vec::new()), &history)
            .await
            .unwrap();

        assert_eq!(retrieve.hits_async().await, 0);
        assert!(!answer.context_used);
        assert!(answer.history_used);
        assert_eq!(answer.language, Language::English);
        assert!(mock.last_prompt().unwrap().contains("User: What is DNA?\nAssistant: A molecule."));
    }

    #[tokio::test]
    async fn test_unreachable_indexer_still_answers() {
        let mock = Arc::new(MockBackend::replying("Jawaban umum."));
        let answer = engine(mock, "http://127.0.0.1:1")
            .generate_response("Jelaskan gravitasi", None, &[])
            .await
            .unwrap();
        assert!(!answer.context_used);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_is_generation_error() {
        let mock = Arc::new(MockBackend::failing());
        let err = engine(mock, "http://127.0.0.1:1")
            .generate_response("Halo", Some(Vec::new()), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to generate response:"));
    }

    #[tokio::test]
    async fn test_direct_response() {
        let mock = Arc::new(MockBackend::replying("Hello!"));
        let answer = engine(mock.clone(), "http://127.0.0.1:1")
            .generate_direct_response("What is the speed of light?")
            .await
            .unwrap();
        assert_eq!(answer.reply, "Hello!");
        assert_eq!(answer.language, Language::English);
        let prompt = mock.last_prompt().unwrap();
        assert!(prompt.ends_with("PERTANYAAN: What is the speed of light?\n\nJAWABAN:"));
    }
}
