//! Eval query type: one labeled row of the query set (spec.md §6).

use serde::Deserialize;
use std::collections::HashSet;

use crate::document::Document;

/// One query set row. The ground-truth field keeps the original's literal
/// JSON key (`"relevant APIs"`, with a space) — `tool_bench_hi_rag.py`
/// reads `query_i['relevant APIs']` directly.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalQuery {
    pub query: String,
    #[serde(rename = "relevant APIs")]
    pub relevant_apis: Vec<String>,
}

impl EvalQuery {
    /// Binary relevance: a retrieved document is relevant if its
    /// `metadata.service` is in this query's ground-truth set (spec.md §4.8).
    pub fn is_relevant(&self, document: &Document) -> bool {
        let Some(service) = document.service() else {
            return false;
        };
        self.relevant_apis.iter().any(|s| s == service)
    }

    pub fn relevant_set(&self) -> HashSet<&str> {
        self.relevant_apis.iter().map(String::as_str).collect()
    }
}
