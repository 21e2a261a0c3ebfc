//! Evaluation framework: labeled query sets, NDCG and companion metrics,
//! and the JSON report (spec.md §4.8, §6).

pub mod metrics;
pub mod ndcg;
pub mod query;
pub mod report;

pub use metrics::{mean_reciprocal_rank, precision_at_k, recall_at_k};
pub use ndcg::ndcg_at_k;
pub use query::EvalQuery;
pub use report::{build_report, Report};
