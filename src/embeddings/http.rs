//! Production Embedding Client: HTTP POST to `{base_url}/embeddings`
//! (spec.md §6), grounded on the teacher's `OpenAIEmbedder`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingClient;
use crate::error::{Result, RouterError};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP-backed `EmbeddingClient`. No retries at this layer (spec.md §4.1);
/// callers that want retries compose it themselves, the way the teacher's
/// `embed_with_retry` sits one layer above its raw `embed_batch_internal`.
pub struct HttpEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
    dimension: Option<usize>,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, batch_size: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            batch_size: batch_size.max(1),
            dimension: None,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RouterError::RemoteUnavailable(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RouterError::Auth(format!("embedding service rejected credentials: {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RouterError::RemoteUnavailable(format!("embedding service returned {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RouterError::BadResponse(format!("malformed embedding response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(RouterError::BadResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
