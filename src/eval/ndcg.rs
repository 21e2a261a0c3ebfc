//! Normalized Discounted Cumulative Gain, spec.md §4.8.
//!
//! Binary relevance: `DCG@k = Σ_{i=0..k-1} rel_i / log2(i + 2)`. `IDCG@k` is
//! the DCG of `min(k, |relevant|)` ones followed by zeros. `NDCG@k =
//! DCG/IDCG`, or 0 when `IDCG = 0` (no relevant documents exist at all).

use crate::eval::EvalQuery;
use crate::search::Ranking;

/// `k` depths this evaluator reports (spec.md §4.8: `k ∈ {1, 3, 5}`).
pub const DEPTHS: [usize; 3] = [1, 3, 5];

fn dcg(relevance: &[bool], k: usize) -> f32 {
    relevance
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &rel)| if rel { 1.0 / ((i as f32 + 2.0).log2()) } else { 0.0 })
        .sum()
}

fn idcg(num_relevant: usize, k: usize) -> f32 {
    let ones = num_relevant.min(k);
    (0..ones).map(|i| 1.0 / ((i as f32 + 2.0).log2())).sum()
}

/// NDCG@k for a single query's ranking against its ground truth. Returns 0
/// when the query has no relevant services at all (spec.md §4.8: "or 0 when
/// IDCG = 0").
pub fn ndcg_at_k(query: &EvalQuery, ranking: &Ranking, k: usize) -> f32 {
    let relevance: Vec<bool> = ranking.results.iter().map(|r| query.is_relevant(&r.document)).collect();
    let ideal = idcg(query.relevant_apis.len(), k);
    if ideal == 0.0 {
        return 0.0;
    }
    dcg(&relevance, k) / ideal
}
