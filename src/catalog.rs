//! Tool catalog ingestion: parses the catalog JSON and builds the three
//! granularity-specific Corpuses (`type_service`, `type_service_tool`, `tool`).

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::document::{Corpus, Document};
use crate::error::{Result, RouterError};

/// A single row of the input tool catalog. `type`/`service`/`tool` are
/// required (spec.md §6); everything else (`summary`, `port`, ...) is
/// preserved verbatim in `Document::metadata` but never required.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "type")]
    pub type_: String,
    pub service: String,
    pub tool: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Which granularity a Document/Corpus was built at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    TypeService,
    TypeServiceTool,
    Tool,
}

impl Granularity {
    pub fn index_name(self) -> &'static str {
        match self {
            Granularity::TypeService => "type_service_index",
            Granularity::TypeServiceTool => "type_service_tool_index",
            Granularity::Tool => "tool_index",
        }
    }

    fn content(self, row: &CatalogRow) -> String {
        match self {
            Granularity::TypeService => format!("type: {} service: {}", row.type_, row.service),
            Granularity::TypeServiceTool => {
                format!("type: {} service: {} tool: {}", row.type_, row.service, row.tool)
            }
            Granularity::Tool => format!("tool: {}", row.tool),
        }
    }
}

/// Parses a UTF-8 JSON array of catalog rows (spec.md §6 Tool catalog input).
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogRow>> {
    serde_json::from_str(json).map_err(RouterError::Serde)
}

/// Builds a Document for `row` at the given granularity. The row's position
/// in the catalog becomes `metadata.id` so corpus position and external id
/// agree across the three granularity corpora (spec.md Property 3).
fn build_document(row: &CatalogRow, position: usize, granularity: Granularity) -> Document {
    let mut metadata = row.extra.clone();
    metadata.insert("id".to_string(), Value::String(position.to_string()));
    metadata.insert("type".to_string(), Value::String(row.type_.clone()));
    metadata.insert("service".to_string(), Value::String(row.service.clone()));
    metadata.insert("tool".to_string(), Value::String(row.tool.clone()));
    Document::with_metadata(granularity.content(row), metadata)
}

/// Builds the three parallel granularity Corpuses from the same catalog rows,
/// preserving row order so position `i` in every corpus refers to the same
/// catalog row (spec.md Property 3, granularity monotonicity).
pub fn build_corpora(rows: &[CatalogRow]) -> (Corpus, Corpus, Corpus) {
    let type_service = Corpus::new(
        rows.iter()
            .enumerate()
            .map(|(i, r)| build_document(r, i, Granularity::TypeService))
            .collect(),
    );
    let type_service_tool = Corpus::new(
        rows.iter()
            .enumerate()
            .map(|(i, r)| build_document(r, i, Granularity::TypeServiceTool))
            .collect(),
    );
    let tool = Corpus::new(
        rows.iter()
            .enumerate()
            .map(|(i, r)| build_document(r, i, Granularity::Tool))
            .collect(),
    );
    (type_service, type_service_tool, tool)
}

/// Lookup from corpus position back to full catalog metadata, the
/// generalized analog of the original's `summary2other` mapping. Keyed by
/// position rather than content string, since content strings collide across
/// rows sharing the same `(type, service)` pair.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    rows: Vec<CatalogRow>,
}

impl CatalogIndex {
    pub fn new(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    pub fn get(&self, position: usize) -> Option<&CatalogRow> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"[
            {"type": "weather", "service": "A", "tool": "a1"},
            {"type": "search", "service": "B", "tool": "b1", "summary": "general web search"},
            {"type": "search", "service": "C", "tool": "c1", "port": 8081}
        ]"#
    }

    #[test]
    fn parses_required_and_extra_fields() {
        let rows = parse_catalog(sample_json()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].service, "B");
        assert_eq!(rows[1].extra.get("summary").unwrap().as_str(), Some("general web search"));
        assert_eq!(rows[2].extra.get("port").unwrap().as_i64(), Some(8081));
    }

    #[test]
    fn ignores_unknown_fields_without_choking() {
        let json = r#"[{"type": "x", "service": "y", "tool": "z", "unused_field": true}]"#;
        let rows = parse_catalog(json).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn builds_parallel_corpora_with_matching_row_counts() {
        let rows = parse_catalog(sample_json()).unwrap();
        let (ts, tst, t) = build_corpora(&rows);
        assert_eq!(ts.len(), 3);
        assert_eq!(tst.len(), 3);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn type_service_tool_content_matches_spec_format() {
        let rows = parse_catalog(sample_json()).unwrap();
        let (_, tst, _) = build_corpora(&rows);
        assert_eq!(tst.get(0).unwrap().content, "type: weather service: A tool: a1");
    }

    #[test]
    fn tool_granularity_content_matches_spec_format() {
        let rows = parse_catalog(sample_json()).unwrap();
        let (_, _, tool) = build_corpora(&rows);
        assert_eq!(tool.get(1).unwrap().content, "tool: b1");
    }

    #[test]
    fn document_id_is_row_position_as_string() {
        let rows = parse_catalog(sample_json()).unwrap();
        let (ts, _, _) = build_corpora(&rows);
        assert_eq!(ts.get(2).unwrap().id(), Some("2"));
    }

    #[test]
    fn catalog_index_recovers_full_row_by_position() {
        let rows = parse_catalog(sample_json()).unwrap();
        let index = CatalogIndex::new(rows);
        assert_eq!(index.get(1).unwrap().service, "B");
        assert_eq!(index.len(), 3);
    }
}
