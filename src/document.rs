//! Document and Corpus types: the shared unit all indexes align rows to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{Result, RouterError};

/// Reserved metadata key under which a fused Ranking stashes its RRF score.
pub const RRF_SCORE_KEY: &str = "_rrf_score";

/// An immutable indexed unit: the text surface form plus arbitrary metadata.
///
/// `metadata.id`, when present, is the document's stable external identity;
/// `type`/`service`/`tool` live here too, depending on granularity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(content: impl Into<String>, metadata: HashMap<String, Value>) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// `metadata.id` as a string, if present and string-shaped.
    pub fn id(&self) -> Option<&str> {
        self.metadata.get("id").and_then(Value::as_str)
    }

    pub fn service(&self) -> Option<&str> {
        self.metadata.get("service").and_then(Value::as_str)
    }

    /// Stable identity used by fusion/dedup: `metadata.id` if present,
    /// otherwise a content hash rendered as a string (spec.md §4.6).
    pub fn identity(&self) -> String {
        match self.id() {
            Some(id) => id.to_string(),
            None => {
                let mut hasher = std::collections::hash_map::DefaultHasher::new();
                self.content.hash(&mut hasher);
                format!("content:{:016x}", hasher.finish())
            }
        }
    }
}

/// An ordered sequence of Documents; corpus position is the canonical
/// integer identifier used by BM25 and vector indexes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    /// Validates that every document carries the metadata fields required
    /// at this granularity (spec.md §7 `CorpusInvalid`).
    pub fn validate_required_fields(&self, required: &[&str]) -> Result<()> {
        for (idx, doc) in self.documents.iter().enumerate() {
            for field in required {
                if !doc.metadata.contains_key(*field) {
                    return Err(RouterError::CorpusInvalid(format!(
                        "document at position {idx} missing required metadata field '{field}'"
                    )));
                }
            }
        }
        Ok(())
    }
}
