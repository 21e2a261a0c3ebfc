//! Hybrid retrieval via Reciprocal Rank Fusion, spec.md §4.6.
//!
//! Fusion itself is grounded on the teacher's `reciprocal_rank_fusion`
//! (HashMap-accumulate by document key, `weight / (k + rank + 1)`, re-sort
//! descending). Unlike the teacher, this keeps the raw fused score —
//! spec.md's Property 2 pins the exact RRF formula, and a post-hoc min-max
//! renormalization would violate it, so that step and the teacher's adaptive
//! threshold are both dropped here (see DESIGN.md).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::cache::EmbeddingCache;
use crate::document::{Document, RRF_SCORE_KEY};
use crate::embeddings::EmbeddingClient;
use crate::error::Result;
use crate::rerank::RerankerClient;
use crate::search::bm25::BM25Index;
use crate::search::vector::FlatVectorIndex;
use crate::search::{RankedDocument, Ranking, Retriever};

const DEFAULT_RRF_K: f32 = 60.0;
const EMBEDDING_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub bm25_weight: f32,
    pub vector_weight: f32,
    pub rrf_k: f32,
    pub top_k: usize,
    pub rerank_top_k: usize,
    pub enable_cache: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            bm25_weight: 0.5,
            vector_weight: 0.5,
            rrf_k: DEFAULT_RRF_K,
            top_k: 10,
            rerank_top_k: 5,
            enable_cache: true,
        }
    }
}

/// Owns the lexical and vector sub-indexes over the same corpus plus the
/// model adapters needed to embed queries and, optionally, rerank fused
/// results. A process-local ranking cache keyed by `(query, mode, k)` avoids
/// recomputing identical queries within a run (spec.md §5); a separate
/// `EmbeddingCache` keyed only by query text sits underneath it, so a query
/// repeated at a different `k` still skips the embedding HTTP call even
/// though the ranking cache misses. The embedding cache is disabled when
/// `config.enable_cache` is false; the ranking cache is unconditional, since
/// it only ever returns a ranking this same retriever already computed.
pub struct HybridRetriever<E: EmbeddingClient> {
    bm25: BM25Index,
    vector: FlatVectorIndex,
    embedder: E,
    reranker: Option<Box<dyn RerankerClient>>,
    config: FusionConfig,
    cache: RwLock<HashMap<(String, &'static str, usize), Ranking>>,
    embedding_cache: Option<EmbeddingCache>,
}

impl<E: EmbeddingClient> HybridRetriever<E> {
    pub fn new(bm25: BM25Index, vector: FlatVectorIndex, embedder: E, config: FusionConfig) -> Self {
        let embedding_cache = config.enable_cache.then(|| EmbeddingCache::new(EMBEDDING_CACHE_CAPACITY));
        Self {
            bm25,
            vector,
            embedder,
            reranker: None,
            config,
            cache: RwLock::new(HashMap::new()),
            embedding_cache,
        }
    }

    pub fn with_reranker(mut self, reranker: Box<dyn RerankerClient>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    fn cached_or<F>(&self, query: &str, mode: &'static str, k: usize, compute: F) -> Ranking
    where
        F: FnOnce() -> Ranking,
    {
        let key = (query.to_string(), mode, k);
        if let Some(hit) = self.cache.read().unwrap().get(&key) {
            return hit.clone();
        }
        let ranking = compute();
        self.cache.write().unwrap().insert(key, ranking.clone());
        ranking
    }

    /// Lexical-only ranking (spec.md §4.6 `bm25`).
    pub fn bm25(&self, query: &str, k: usize) -> Ranking {
        self.cached_or(query, "bm25", k, || self.bm25.topk(query, k))
    }

    /// Dense-only ranking; embeds `query` via the configured client
    /// (spec.md §4.6 `vector`), going through the embedding cache first so a
    /// repeated query at a different `k` still skips the HTTP call.
    pub async fn vector(&self, query: &str, k: usize) -> Result<Ranking> {
        if let Some(hit) = self.cache.read().unwrap().get(&(query.to_string(), "vector", k)) {
            return Ok(hit.clone());
        }
        let vector = self.embed_query(query).await?;
        let ranking = self.vector.topk(&vector, k);
        self.cache
            .write()
            .unwrap()
            .insert((query.to_string(), "vector", k), ranking.clone());
        Ok(ranking)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.embedding_cache {
            if let Some(hit) = cache.get(query) {
                return Ok(hit);
            }
        }
        let vectors = self.embedder.embed(std::slice::from_ref(&query.to_string())).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();
        if let Some(cache) = &self.embedding_cache {
            cache.put(query.to_string(), vector.clone());
        }
        Ok(vector)
    }

    /// Fuses lexical and dense rankings by Reciprocal Rank Fusion
    /// (spec.md §4.6 `hybrid`, Property 2).
    pub async fn hybrid(&self, query: &str, k: usize) -> Result<Ranking> {
        if let Some(hit) = self.cache.read().unwrap().get(&(query.to_string(), "hybrid", k)) {
            return Ok(hit.clone());
        }

        // Widen the candidate pool each leg contributes so fusion has enough
        // material to pick the true top-k from; the teacher does the same
        // before fusing. BM25 and the embed-then-search vector leg run
        // concurrently, the way the teacher's search_hybrid joins its two
        // legs rather than awaiting them in sequence.
        let pool = (k * 4).max(k);
        let (bm25_ranking, vector_ranking) = tokio::join!(
            async { self.bm25.topk(query, pool) },
            self.vector(query, pool),
        );
        let vector_ranking = vector_ranking?;

        let fused = reciprocal_rank_fusion(
            &[(&bm25_ranking, self.config.bm25_weight), (&vector_ranking, self.config.vector_weight)],
            self.config.rrf_k,
            k,
        );

        self.cache
            .write()
            .unwrap()
            .insert((query.to_string(), "hybrid", k), fused.clone());
        Ok(fused)
    }

    /// Hybrid fusion followed by neural rerank of the fused top
    /// `rerank_top_k` (spec.md §4.6 `hybrid_rerank`). If the reranker call
    /// fails, falls back to the fused order truncated to `rerank_top_k`
    /// (spec.md §7 degraded path).
    pub async fn hybrid_rerank(&self, query: &str, k: usize) -> Result<Ranking> {
        let fused = self.hybrid(query, k.max(self.config.rerank_top_k)).await?;
        let Some(reranker) = &self.reranker else {
            let mut results = fused.results;
            results.truncate(k);
            return Ok(Ranking::new(results));
        };

        let candidates: Vec<RankedDocument> = fused.results.into_iter().take(self.config.rerank_top_k).collect();
        let docs: Vec<String> = candidates.iter().map(|c| c.document.content.clone()).collect();

        match reranker.rerank(query, &docs, self.config.rerank_top_k).await {
            Ok(mut scored) => {
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                let results = scored
                    .into_iter()
                    .filter_map(|(i, score)| candidates.get(i).map(|c| RankedDocument { document: c.document.clone(), score }))
                    .collect();
                Ok(Ranking::new(results))
            }
            Err(err) => {
                log::warn!("reranker unavailable ({err}), falling back to fused order");
                let mut results = candidates;
                results.truncate(self.config.rerank_top_k);
                Ok(Ranking::new(results))
            }
        }
    }
}

/// `Retriever::topk` for a `HybridRetriever` is its fused ranking (spec.md
/// §9): the reranked path is only reachable through `hybrid_rerank`
/// directly, since polymorphic callers shouldn't have to know whether a
/// reranker was attached.
#[async_trait]
impl<E: EmbeddingClient> Retriever for HybridRetriever<E> {
    async fn topk(&self, query: &str, k: usize) -> Result<Ranking> {
        self.hybrid(query, k).await
    }
}

/// Combines any number of weighted rankings by Reciprocal Rank Fusion,
/// keyed on `Document::identity()` (spec.md Property 2):
///
/// `score(d) = sum over legs of weight / (k + rank_in_leg(d) + 1)`
///
/// where `rank_in_leg` is 0-based and legs that don't contain `d` contribute
/// nothing. Ties are broken by the lowest minimum rank across legs, then by
/// first-seen corpus order.
pub fn reciprocal_rank_fusion(legs: &[(&Ranking, f32); 2], rrf_k: f32, top_k: usize) -> Ranking {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut documents: HashMap<String, Document> = HashMap::new();
    let mut best_rank: HashMap<String, usize> = HashMap::new();
    let mut first_seen_order: HashMap<String, usize> = HashMap::new();
    let mut order_counter = 0usize;

    for (ranking, weight) in legs {
        for (rank, ranked) in ranking.results.iter().enumerate() {
            let id = ranked.document.identity();
            *scores.entry(id.clone()).or_insert(0.0) += weight / (rrf_k + rank as f32 + 1.0);
            documents.entry(id.clone()).or_insert_with(|| ranked.document.clone());
            best_rank
                .entry(id.clone())
                .and_modify(|r| *r = (*r).min(rank))
                .or_insert(rank);
            first_seen_order.entry(id.clone()).or_insert_with(|| {
                let n = order_counter;
                order_counter += 1;
                n
            });
        }
    }

    let mut ids: Vec<String> = scores.keys().cloned().collect();
    ids.sort_by(|a, b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(best_rank[a].cmp(&best_rank[b]))
            .then(first_seen_order[a].cmp(&first_seen_order[b]))
    });
    ids.truncate(top_k);

    let results = ids
        .into_iter()
        .map(|id| {
            let score = scores[&id];
            let mut document = documents.remove(&id).expect("id came from documents map");
            document
                .metadata
                .insert(RRF_SCORE_KEY.to_string(), serde_json::json!(score));
            RankedDocument { document, score }
        })
        .collect();

    Ranking::new(results)
}
