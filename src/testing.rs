//! In-memory test doubles for the remote model adapters (spec.md §9:
//! "production implementations wrap HTTP, tests inject in-memory stubs").

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::embeddings::EmbeddingClient;
use crate::error::{Result, RouterError};
use crate::rerank::RerankerClient;
use crate::tokenize::Tokenizer;

/// Deterministic term-hash embedder: every distinct token deterministically
/// lights up one dimension, so two texts sharing terms will have nonzero
/// cosine similarity and a query that repeats a document's exact terms gets
/// an exact vector match (used by S1's "exact term-based vectors").
pub struct StubEmbeddingClient {
    dimension: usize,
}

impl StubEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = Tokenizer::detect(text).tokenize(text);
        for token in &tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let slot = (hasher.finish() as usize) % self.dimension;
            vector[slot] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for StubEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn model_id(&self) -> &str {
        "stub-embedding-v1"
    }
}

/// Reranker stub: scores documents by how many query tokens they share,
/// descending. Deterministic, so rerank-path tests can assert exact order.
pub struct StubRerankerClient;

impl StubRerankerClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubRerankerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankerClient for StubRerankerClient {
    async fn rerank(&self, query: &str, docs: &[String], top_n: usize) -> Result<Vec<(usize, f32)>> {
        let query_tokens: Vec<String> = Tokenizer::detect(query).tokenize(query);
        let mut scored: Vec<(usize, f32)> = docs
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let doc_tokens = Tokenizer::detect(d).tokenize(d);
                let overlap = query_tokens.iter().filter(|t| doc_tokens.contains(t)).count();
                (i, overlap as f32)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);
        Ok(scored)
    }
}

/// Always fails with `RemoteUnavailable`, for exercising §7's degraded path
/// (S4: "Reranker returns HTTP 500").
pub struct FailingRerankerClient;

impl FailingRerankerClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FailingRerankerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RerankerClient for FailingRerankerClient {
    async fn rerank(&self, _query: &str, _docs: &[String], _top_n: usize) -> Result<Vec<(usize, f32)>> {
        Err(RouterError::RemoteUnavailable("simulated HTTP 500 from reranker".to_string()))
    }
}

/// Reranker stub that returns `(index, score)` pairs in plain index order,
/// regardless of whether `scores` is sorted. Exercises the caller-sorts
/// contract documented on `RerankerClient::rerank`: a well behaved caller
/// must sort by score descending itself rather than trust the returned
/// order. Pass an unsorted `scores` vector to catch a caller that doesn't.
pub struct UnsortedRerankerClient {
    scores: Vec<f32>,
}

impl UnsortedRerankerClient {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }
}

#[async_trait]
impl RerankerClient for UnsortedRerankerClient {
    async fn rerank(&self, _query: &str, docs: &[String], top_n: usize) -> Result<Vec<(usize, f32)>> {
        let mut pairs: Vec<(usize, f32)> = (0..docs.len()).map(|i| (i, self.scores[i])).collect();
        pairs.truncate(top_n);
        Ok(pairs)
    }
}
