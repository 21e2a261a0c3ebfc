//! Search: the Lexical, Vector, Hybrid, and Hierarchical retrievers, unified
//! behind a single `Retriever` capability (spec.md §9).

pub mod bm25;
pub mod hierarchical;
pub mod hybrid;
pub mod vector;

pub use bm25::BM25Index;
pub use hierarchical::{HierarchicalResult, HierarchicalRetriever};
pub use hybrid::HybridRetriever;
pub use vector::{FlatVectorIndex, VectorRetriever};

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// A single scored result: the document plus the score it earned from
/// whichever retriever produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub document: Document,
    pub score: f32,
}

/// An ordered sequence of scored Documents (spec.md §3 "Ranking").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub results: Vec<RankedDocument>,
}

impl Ranking {
    pub fn new(results: Vec<RankedDocument>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.results.iter().map(|r| r.document.identity()).collect()
    }
}

/// Shared capability across BM25, Vector, Hybrid, and Hierarchical retrievers
/// (spec.md §9 "Polymorphism across retrievers").
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn topk(&self, query: &str, k: usize) -> Result<Ranking>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn ranking_ids_preserve_order() {
        let ranking = Ranking::new(vec![
            RankedDocument {
                document: Document::with_metadata("a", HashMap::from([("id".to_string(), serde_json::json!("x"))])),
                score: 0.9,
            },
            RankedDocument {
                document: Document::with_metadata("b", HashMap::from([("id".to_string(), serde_json::json!("y"))])),
                score: 0.5,
            },
        ]);
        assert_eq!(ranking.ids(), vec!["x", "y"]);
    }
}
