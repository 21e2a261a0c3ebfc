//! Embedding Client: adapter capability turning text into dense vectors
//! (spec.md §4.1).

pub mod http;

pub use http::HttpEmbeddingClient;

use async_trait::async_trait;

use crate::error::Result;

/// Turns a batch of strings into a batch of equal-dimension dense vectors,
/// one per input, in the same order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The configured dimension of vectors this client produces, when known
    /// ahead of a call. Used by `IndexStore::load` to validate compatibility
    /// without an extra round trip.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Identifier recorded in the persisted bundle's `config.json` and
    /// checked against on load (spec.md §4.5).
    fn model_id(&self) -> &str;
}
