//! Hierarchical (coarse-to-fine) retrieval, spec.md §4.7.
//!
//! Grounded directly on the original's `hi_rag_test`
//! (`original_source/app/mul_mcp/mulmcp.py`): a coarse pass narrows to a
//! handful of `(type, service)` candidates, a fine pass searches full
//! `(type, service, tool)` rows, content-substring filtering keeps only fine
//! rows that belong to a coarse hit, and the shortlist is neural-reranked.

use async_trait::async_trait;

use crate::embeddings::EmbeddingClient;
use crate::error::Result;
use crate::rerank::RerankerClient;
use crate::search::hybrid::HybridRetriever;
use crate::search::{RankedDocument, Ranking, Retriever};

pub struct HierarchicalRetriever<E: EmbeddingClient> {
    coarse: HybridRetriever<E>,
    fine: HybridRetriever<E>,
    reranker: Box<dyn RerankerClient>,
    stage1_top_k: usize,
}

/// A hierarchical search result plus the bookkeeping spec.md §7 asks tests
/// to assert on: how many stage-2 rows survived the coarse-key filter.
#[derive(Debug, Clone)]
pub struct HierarchicalResult {
    pub ranking: Ranking,
    pub stage2_filtered_count: usize,
}

impl<E: EmbeddingClient> HierarchicalRetriever<E> {
    pub fn new(coarse: HybridRetriever<E>, fine: HybridRetriever<E>, reranker: Box<dyn RerankerClient>, stage1_top_k: usize) -> Self {
        Self {
            coarse,
            fine,
            reranker,
            stage1_top_k,
        }
    }

    /// Stage 1: hybrid search against the coarse index for `stage1_top_k`
    /// `(type, service)` rows. Stage 2: hybrid search against the fine index
    /// at `2 * stage1_top_k`, substring-filtered against the stage-1
    /// content and truncated to `stage1_top_k`, then neural-reranked. Falls
    /// back to the unfiltered stage-2 shortlist when filtering removes
    /// everything (spec.md §7 degraded path), in which case
    /// `stage2_filtered_count` is the unfiltered count.
    pub async fn search(&self, query: &str, k: usize) -> Result<HierarchicalResult> {
        let stage1 = self.coarse.hybrid(query, self.stage1_top_k).await?;
        let stage2 = self.fine.hybrid(query, self.stage1_top_k * 2).await?;

        let coarse_keys: Vec<&str> = stage1.results.iter().map(|r| r.document.content.as_str()).collect();

        let mut filtered: Vec<RankedDocument> = stage2
            .results
            .iter()
            .filter(|candidate| coarse_keys.iter().any(|key| candidate.document.content.contains(key)))
            .cloned()
            .collect();

        let stage2_filtered_count = filtered.len();
        let shortlist = if filtered.is_empty() {
            log::warn!("stage-2 substring filter removed every candidate, falling back to unfiltered stage-2 results");
            stage2.results
        } else {
            filtered.truncate(self.stage1_top_k);
            filtered
        };

        let docs: Vec<String> = shortlist.iter().map(|c| c.document.content.clone()).collect();
        let ranking = match self.reranker.rerank(query, &docs, k).await {
            Ok(mut scored) => {
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                Ranking::new(
                    scored
                        .into_iter()
                        .filter_map(|(i, score)| shortlist.get(i).map(|c| RankedDocument { document: c.document.clone(), score }))
                        .collect(),
                )
            }
            Err(err) => {
                log::warn!("reranker unavailable ({err}), returning unranked stage-2 shortlist");
                let mut results = shortlist;
                results.truncate(k);
                Ranking::new(results)
            }
        };

        Ok(HierarchicalResult { ranking, stage2_filtered_count })
    }
}

/// `Retriever::topk` for a `HierarchicalRetriever` discards
/// `stage2_filtered_count` and returns just the ranking (spec.md §9).
#[async_trait]
impl<E: EmbeddingClient> Retriever for HierarchicalRetriever<E> {
    async fn topk(&self, query: &str, k: usize) -> Result<Ranking> {
        self.search(query, k).await.map(|r| r.ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Corpus, Document};
    use crate::search::bm25::BM25Index;
    use crate::search::hybrid::FusionConfig;
    use crate::search::vector::FlatVectorIndex;
    use crate::testing::{StubEmbeddingClient, StubRerankerClient};

    fn build_retriever(rows: &[&str]) -> HybridRetriever<StubEmbeddingClient> {
        let corpus = Corpus::new(rows.iter().map(|r| Document::new(*r)).collect());
        let bm25 = BM25Index::build(corpus.clone());
        let embedder = StubEmbeddingClient::new(32);
        let vectors = rows.iter().map(|_| vec![1.0; 32]).collect();
        let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();
        HybridRetriever::new(bm25, vector_index, embedder, FusionConfig::default())
    }

    #[tokio::test]
    async fn stage2_filter_narrows_to_rows_belonging_to_the_coarse_hit() {
        let coarse = build_retriever(&["type: weather service: Amsterdam", "type: search service: Bing"]);
        let fine = build_retriever(&[
            "type: weather service: Amsterdam tool: forecast",
            "type: weather service: Amsterdam tool: alerts",
            "type: search service: Bing tool: web_search",
        ]);
        let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(StubRerankerClient::new()), 1);

        let result = retriever.search("weather amsterdam forecast", 5).await.unwrap();
        assert_eq!(result.stage2_filtered_count, 2);
        for ranked in &result.ranking.results {
            assert!(ranked.document.content.contains("Amsterdam"));
        }
    }

    #[tokio::test]
    async fn falls_back_to_unfiltered_stage2_when_filter_removes_everything() {
        let coarse = build_retriever(&["type: weather service: Nowhere"]);
        let fine = build_retriever(&["type: search service: Bing tool: web_search"]);
        let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(StubRerankerClient::new()), 1);

        let result = retriever.search("anything", 5).await.unwrap();
        assert_eq!(result.stage2_filtered_count, 0);
        assert!(!result.ranking.is_empty());
    }

    #[tokio::test]
    async fn filtered_shortlist_longer_than_stage1_top_k_is_truncated_before_rerank() {
        let coarse = build_retriever(&["type: weather service: Amsterdam"]);
        let fine = build_retriever(&[
            "type: weather service: Amsterdam tool: forecast",
            "type: weather service: Amsterdam tool: alerts",
            "type: weather service: Amsterdam tool: radar",
            "type: weather service: Amsterdam tool: historical",
        ]);
        let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(StubRerankerClient::new()), 2);

        let result = retriever.search("weather amsterdam", 5).await.unwrap();
        assert_eq!(result.stage2_filtered_count, 4);
        assert!(result.ranking.results.len() <= 2);
    }

    #[tokio::test]
    async fn reranked_shortlist_sorts_by_score_regardless_of_reranker_return_order() {
        use crate::testing::UnsortedRerankerClient;

        let coarse = build_retriever(&["type: weather service: Amsterdam"]);
        let fine = build_retriever(&[
            "type: weather service: Amsterdam tool: forecast",
            "type: weather service: Amsterdam tool: alerts",
        ]);
        let retriever =
            HierarchicalRetriever::new(coarse, fine, Box::new(UnsortedRerankerClient::new(vec![0.2, 0.8])), 2);

        let result = retriever.search("weather amsterdam", 5).await.unwrap();
        let scores: Vec<f32> = result.ranking.results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.8, 0.2]);
    }

    #[tokio::test]
    async fn retriever_topk_matches_search_ranking() {
        let coarse = build_retriever(&["type: weather service: Amsterdam"]);
        let fine = build_retriever(&[
            "type: weather service: Amsterdam tool: forecast",
            "type: weather service: Amsterdam tool: alerts",
        ]);
        let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(StubRerankerClient::new()), 2);

        let via_trait = Retriever::topk(&retriever, "weather amsterdam", 5).await.unwrap();
        let via_search = retriever.search("weather amsterdam", 5).await.unwrap();
        assert_eq!(via_trait.ids(), via_search.ranking.ids());
    }
}
