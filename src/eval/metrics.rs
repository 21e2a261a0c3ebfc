//! Precision@K, Recall@K, and Mean Reciprocal Rank — additive to NDCG
//! (spec.md §4.8 names NDCG as the core metric; these are carried over
//! from the teacher's `eval/metrics.rs` as a natural complement).

use crate::eval::EvalQuery;
use crate::search::Ranking;

pub fn precision_at_k(query: &EvalQuery, ranking: &Ranking, k: usize) -> f32 {
    if k == 0 {
        return 0.0;
    }
    let relevant_count = ranking.results.iter().take(k).filter(|r| query.is_relevant(&r.document)).count();
    relevant_count as f32 / k as f32
}

pub fn recall_at_k(query: &EvalQuery, ranking: &Ranking, k: usize) -> f32 {
    if query.relevant_apis.is_empty() {
        return 0.0;
    }
    let relevant_set = query.relevant_set();
    let retrieved_relevant = ranking.results.iter().take(k).filter(|r| query.is_relevant(&r.document)).count();
    retrieved_relevant as f32 / relevant_set.len() as f32
}

/// Average of `1 / (rank + 1)` of the first relevant result per query; 0 for
/// queries with no relevant result. Returns 0.0 when `queries` is empty.
pub fn mean_reciprocal_rank(queries: &[EvalQuery], rankings: &[Ranking]) -> f32 {
    if queries.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for (query, ranking) in queries.iter().zip(rankings.iter()) {
        for (rank, result) in ranking.results.iter().enumerate() {
            if query.is_relevant(&result.document) {
                sum += 1.0 / (rank + 1) as f32;
                break;
            }
        }
    }
    sum / queries.len() as f32
}
