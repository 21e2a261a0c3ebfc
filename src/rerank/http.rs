//! Production Reranker Client: HTTP POST to `{base_url}/rerank` (spec.md §6),
//! grounded on the same request/response/error shape as `HttpEmbeddingClient`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::RerankerClient;
use crate::error::{Result, RouterError};

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
    return_documents: bool,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRow>,
}

#[derive(Deserialize)]
struct RerankResultRow {
    index: usize,
    relevance_score: f32,
}

pub struct HttpRerankerClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpRerankerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl RerankerClient for HttpRerankerClient {
    async fn rerank(&self, query: &str, docs: &[String], top_n: usize) -> Result<Vec<(usize, f32)>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents: docs,
            top_n,
            return_documents: false,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RouterError::RemoteUnavailable(format!("rerank request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RouterError::Auth(format!("rerank service rejected credentials: {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RouterError::RemoteUnavailable(format!("rerank service returned {status}: {body}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RouterError::BadResponse(format!("malformed rerank response: {e}")))?;

        if parsed.results.iter().any(|r| r.index >= docs.len()) {
            return Err(RouterError::BadResponse(
                "rerank response index out of bounds".to_string(),
            ));
        }

        Ok(parsed.results.into_iter().map(|r| (r.index, r.relevance_score)).collect())
    }
}
