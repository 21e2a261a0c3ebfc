//! Reranker Client: adapter capability scoring `(query, document)` pairs
//! (spec.md §4.2).

pub mod http;

pub use http::HttpRerankerClient;

use async_trait::async_trait;

use crate::error::Result;

/// Returns at most `top_n` `(original_index, score)` pairs; higher score is
/// more relevant. Caller-defined order — implementations need not sort.
#[async_trait]
pub trait RerankerClient: Send + Sync {
    async fn rerank(&self, query: &str, docs: &[String], top_n: usize) -> Result<Vec<(usize, f32)>>;
}
