//! HTTP client for the external document indexer.
//!
//! Endpoints:
//!   POST /index          chunk a stored PDF   {document_id, file_path, use_vision}
//!   POST /embed          embed pending chunks ?document_id&batch_size&max_retries
//!   POST /retry-failed   reset failed chunks  ?document_id
//!   POST /retrieve       similarity search    {query, top_k}
//!   GET  /stats          chunk/document counters
//!   GET  /health

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::IndexerError;

/// One chunk returned by `/retrieve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: i64,
    pub document_id: i64,
    pub content: String,
    #[serde(default)]
    pub chunk_index: i64,
    pub similarity: f64,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    success: bool,
    #[serde(default)]
    results: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone)]
pub struct IndexerClient {
    base_url: String,
    client: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Similarity search. Never fails: any transport, status or decode error
    /// is logged and yields no chunks.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedChunk> {
        match self.try_retrieve(query, top_k).await {
            Ok(chunks) => {
                debug!(n = chunks.len(), "context retrieved");
                chunks
            }
            Err(e) => {
                warn!(error = %e, "error retrieving context");
                Vec::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexerError> {
        let body = serde_json::json!({ "query": query, "top_k": top_k });
        let resp = self.client.post(self.url("/retrieve")).json(&body).send().await?;
        let json = check_status(resp).await?;
        let parsed: RetrieveResponse = serde_json::from_value(json)?;
        Ok(if parsed.success { parsed.results } else { Vec::new() })
    }

    /// Ask the indexer to chunk a stored file.
    #[instrument(skip(self))]
    pub async fn index_document(
        &self,
        document_id: i64,
        file_path: &str,
        use_vision: bool,
    ) -> Result<serde_json::Value, IndexerError> {
        let body = serde_json::json!({
            "document_id": document_id,
            "file_path":   file_path,
            "use_vision":  use_vision,
        });
        let resp = self.client.post(self.url("/index")).json(&body).send().await?;
        check_status(resp).await
    }

    /// Embed a document's pending chunks.
    #[instrument(skip(self))]
    pub async fn embed(
        &self,
        document_id: i64,
        batch_size: u32,
        max_retries: u32,
    ) -> Result<serde_json::Value, IndexerError> {
        let resp = self.client
            .post(self.url("/embed"))
            .query(&[
                ("document_id", document_id.to_string()),
                ("batch_size",  batch_size.to_string()),
                ("max_retries", max_retries.to_string()),
            ])
            .send()
            .await?;
        check_status(resp).await
    }

    /// Reset failed chunks to pending, for one document or all of them.
    #[instrument(skip(self))]
    pub async fn retry_failed(
        &self,
        document_id: Option<i64>,
    ) -> Result<serde_json::Value, IndexerError> {
        let mut req = self.client.post(self.url("/retry-failed"));
        if let Some(id) = document_id {
            req = req.query(&[("document_id", id)]);
        }
        check_status(req.send().await?).await
    }

    pub async fn stats(&self) -> Result<serde_json::Value, IndexerError> {
        let resp = self.client.get(self.url("/stats")).send().await?;
        check_status(resp).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, IndexerError> {
        let resp = self.client.get(self.url("/health")).send().await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<serde_json::Value, IndexerError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status >= 400 {
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        let message = body["detail"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or(text);
        return Err(IndexerError::Api { status, message });
    }
    Ok(serde_json::from_str(&text)?)
}
