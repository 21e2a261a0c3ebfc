//! Evaluation report: aggregates NDCG@{1,3,5} (plus Precision/Recall/MRR)
//! across a query set and serializes `evaluation_results_G<n>.json`
//! (spec.md §6).

use serde::Serialize;

use crate::eval::metrics::{mean_reciprocal_rank, precision_at_k, recall_at_k};
use crate::eval::ndcg::{ndcg_at_k, DEPTHS};
use crate::eval::EvalQuery;
use crate::error::Result;
use crate::search::Ranking;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(rename = "ndcg@1")]
    pub ndcg_1: f32,
    #[serde(rename = "ndcg@3")]
    pub ndcg_3: f32,
    #[serde(rename = "ndcg@5")]
    pub ndcg_5: f32,
    pub num_queries: usize,
    #[serde(rename = "detailed_ndcg@1")]
    pub detailed_ndcg_1: Vec<f32>,
    #[serde(rename = "detailed_ndcg@3")]
    pub detailed_ndcg_3: Vec<f32>,
    #[serde(rename = "detailed_ndcg@5")]
    pub detailed_ndcg_5: Vec<f32>,
    // Additive, non-spec-mandated keys kept for parity with the teacher's
    // richer eval report.
    #[serde(rename = "precision@5")]
    pub precision_5: f32,
    #[serde(rename = "recall@10")]
    pub recall_10: f32,
    pub mrr: f32,
}

/// Builds the report from one `Ranking` per query, in the same order as
/// `queries`.
pub fn build_report(queries: &[EvalQuery], rankings: &[Ranking]) -> Report {
    let detailed_ndcg_1: Vec<f32> = queries.iter().zip(rankings).map(|(q, r)| ndcg_at_k(q, r, 1)).collect();
    let detailed_ndcg_3: Vec<f32> = queries.iter().zip(rankings).map(|(q, r)| ndcg_at_k(q, r, 3)).collect();
    let detailed_ndcg_5: Vec<f32> = queries.iter().zip(rankings).map(|(q, r)| ndcg_at_k(q, r, 5)).collect();

    let mean = |values: &[f32]| -> f32 {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f32>() / values.len() as f32
        }
    };

    let precision_5 = mean(&queries.iter().zip(rankings).map(|(q, r)| precision_at_k(q, r, 5)).collect::<Vec<_>>());
    let recall_10 = mean(&queries.iter().zip(rankings).map(|(q, r)| recall_at_k(q, r, 10)).collect::<Vec<_>>());
    let mrr = mean_reciprocal_rank(queries, rankings);

    debug_assert_eq!(DEPTHS, [1, 3, 5]);

    Report {
        ndcg_1: mean(&detailed_ndcg_1),
        ndcg_3: mean(&detailed_ndcg_3),
        ndcg_5: mean(&detailed_ndcg_5),
        num_queries: queries.len(),
        detailed_ndcg_1,
        detailed_ndcg_3,
        detailed_ndcg_5,
        precision_5,
        recall_10,
        mrr,
    }
}

impl Report {
    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::search::RankedDocument;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn ranking(services: &[&str]) -> Ranking {
        Ranking::new(
            services
                .iter()
                .map(|s| RankedDocument {
                    document: Document::with_metadata("content", HashMap::from([("service".to_string(), serde_json::json!(*s))])),
                    score: 1.0,
                })
                .collect(),
        )
    }

    fn query(relevant: &[&str]) -> EvalQuery {
        EvalQuery {
            query: "q".to_string(),
            relevant_apis: relevant.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn report_num_queries_matches_input_length() {
        let queries = vec![query(&["a"]), query(&["b"])];
        let rankings = vec![ranking(&["a"]), ranking(&["x"])];
        let report = build_report(&queries, &rankings);
        assert_eq!(report.num_queries, 2);
        assert_eq!(report.detailed_ndcg_1.len(), 2);
    }

    #[test]
    fn report_serializes_with_literal_at_sign_keys() {
        let report = build_report(&[query(&["a"])], &[ranking(&["a"])]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"ndcg@1\""));
        assert!(json.contains("\"detailed_ndcg@5\""));
    }

    #[test]
    fn write_to_persists_readable_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluation_results_G1.json");
        let report = build_report(&[query(&["a"])], &[ranking(&["a"])]);
        report.write_to(&path).unwrap();

        let read_back: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(read_back["num_queries"], 1);
    }
}
