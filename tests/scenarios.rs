//! End-to-end scenario tests exercising the full retrieval pipeline through
//! the public crate surface, the way an integration suite would drive it
//! against a real catalog.

use std::collections::HashMap;

use tempfile::TempDir;

use toolrouter::document::{Corpus, Document};
use toolrouter::eval::{ndcg_at_k, EvalQuery};
use toolrouter::index_store::IndexConfig;
use toolrouter::search::bm25::BM25Index;
use toolrouter::search::hierarchical::HierarchicalRetriever;
use toolrouter::search::hybrid::{FusionConfig, HybridRetriever};
use toolrouter::search::vector::FlatVectorIndex;
use toolrouter::testing::{FailingRerankerClient, StubEmbeddingClient, StubRerankerClient};
use toolrouter::IndexStore;

fn row(service: &str, content: &str) -> Document {
    let mut metadata = HashMap::new();
    metadata.insert("service".to_string(), serde_json::json!(service));
    Document::with_metadata(content, metadata)
}

/// S1: 3-row catalog, BM25 weight 0 / vector weight 1, stub embedder with
/// exact term-based vectors. Top-1 for "weather in amsterdam" must be the
/// weather row, and NDCG@1 against ground truth `["A"]` must be 1.0.
#[tokio::test]
async fn s1_vector_only_hybrid_ranks_the_matching_service_first() {
    let corpus = Corpus::new(vec![
        row("A", "weather in amsterdam forecast service"),
        row("B", "stock price lookup service"),
        row("C", "currency conversion service"),
    ]);
    let bm25 = BM25Index::build(corpus.clone());
    let embedder = StubEmbeddingClient::new(64);
    let vectors = futures_embed(&embedder, &corpus).await;
    let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();

    let config = FusionConfig {
        bm25_weight: 0.0,
        vector_weight: 1.0,
        ..FusionConfig::default()
    };
    let retriever = HybridRetriever::new(bm25, vector_index, embedder, config);

    let ranking = retriever.hybrid("weather in amsterdam", 3).await.unwrap();
    assert_eq!(ranking.results[0].document.service(), Some("A"));

    let query = EvalQuery {
        query: "weather in amsterdam".to_string(),
        relevant_apis: vec!["A".to_string()],
    };
    assert_eq!(ndcg_at_k(&query, &ranking, 1), 1.0);
}

/// S2: two rows identical except `service`; the query exactly matches the
/// first. RRF with 0.5/0.5 weights and k=60 must place it first with the
/// exact fused score `0.5/61 + 0.5/61`.
#[tokio::test]
async fn s2_rrf_fused_score_matches_the_closed_form_value() {
    let content = "type: weather service: lookup tool: forecast";
    let corpus = Corpus::new(vec![row("A", content), row("B", "type: search service: other tool: web")]);
    let bm25 = BM25Index::build(corpus.clone());
    let embedder = StubEmbeddingClient::new(32);
    let vectors = futures_embed(&embedder, &corpus).await;
    let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();

    let config = FusionConfig {
        bm25_weight: 0.5,
        vector_weight: 0.5,
        rrf_k: 60.0,
        ..FusionConfig::default()
    };
    let retriever = HybridRetriever::new(bm25, vector_index, embedder, config);

    let ranking = retriever.hybrid(content, 2).await.unwrap();
    assert_eq!(ranking.results[0].document.service(), Some("A"));

    let expected = 0.5 / 61.0 + 0.5 / 61.0;
    assert!((ranking.results[0].score - expected).abs() < 1e-4);
}

/// S3: hierarchical retrieval where stage 1 surfaces a single coarse key and
/// stage 2's pre-filter list has one matching row among four non-matching
/// ones; the recorded filtered count must equal 1.
#[tokio::test]
async fn s3_hierarchical_stage2_filter_keeps_only_the_matching_row() {
    let coarse_rows = vec!["type: search service: Bing"];
    let fine_rows = vec![
        "type: search service: Bing tool: web_search",
        "type: weather service: Amsterdam tool: forecast",
        "type: weather service: Amsterdam tool: alerts",
        "type: currency service: Exchange tool: convert",
        "type: maps service: Here tool: directions",
    ];

    let coarse = build_retriever(&coarse_rows).await;
    let fine = build_retriever(&fine_rows).await;
    let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(StubRerankerClient::new()), 1);

    let result = retriever.search("search via Bing", 5).await.unwrap();
    assert_eq!(result.stage2_filtered_count, 1);
    assert_eq!(result.ranking.results.len(), 1);
    assert!(result.ranking.results[0].document.content.contains("Bing"));
}

/// S4: reranker fails (HTTP 500 analog). `hybrid_rerank` must fall back to
/// the first `rerank_top_k` of the hybrid order, unchanged.
#[tokio::test]
async fn s4_hybrid_rerank_degrades_to_fused_order_on_reranker_failure() {
    let corpus = Corpus::new(vec![
        row("A", "type: weather service: A tool: forecast"),
        row("B", "type: search service: B tool: web"),
        row("C", "type: currency service: C tool: convert"),
    ]);
    let bm25 = BM25Index::build(corpus.clone());
    let embedder = StubEmbeddingClient::new(32);
    let vectors = futures_embed(&embedder, &corpus).await;
    let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();

    let config = FusionConfig {
        rerank_top_k: 3,
        ..FusionConfig::default()
    };
    let retriever =
        HybridRetriever::new(bm25, vector_index, embedder, config).with_reranker(Box::new(FailingRerankerClient::new()));

    let fused = retriever.hybrid("weather forecast", 3).await.unwrap();
    let reranked = retriever.hybrid_rerank("weather forecast", 3).await.unwrap();

    let expected_ids: Vec<String> = fused.ids().into_iter().take(3).collect();
    assert_eq!(reranked.ids(), expected_ids);
}

/// S5: save then load an index of 50 rows. The loaded retriever's top-5 for
/// a fixed query must match the pre-save top-5 byte-for-byte, ids and
/// scores both.
#[tokio::test]
async fn s5_saved_and_loaded_index_reproduces_identical_top5() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<Document> = (0..50)
        .map(|i| row(&format!("service-{i}"), &format!("type: demo service: service-{i} tool: op-{i} row {i}")))
        .collect();
    let corpus = Corpus::new(rows);
    let embedder = StubEmbeddingClient::new(48);
    let vectors = futures_embed(&embedder, &corpus).await;
    let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();

    let store = IndexStore::new(dir.path());
    let index_config = IndexConfig {
        embedding_model: embedder.model_id().to_string(),
        top_k: 5,
        bm25_weight: 0.5,
        vector_weight: 0.5,
        rrf_k: 60.0,
    };
    store.save("fifty_rows", &vector_index, &index_config).unwrap();

    let bm25_before = BM25Index::build(vector_index.corpus().clone());
    let fusion = FusionConfig {
        bm25_weight: index_config.bm25_weight,
        vector_weight: index_config.vector_weight,
        rrf_k: index_config.rrf_k,
        top_k: index_config.top_k,
        rerank_top_k: index_config.top_k,
        enable_cache: true,
    };
    let before = HybridRetriever::new(bm25_before, vector_index, StubEmbeddingClient::new(48), fusion.clone());
    let ranking_before = before.hybrid("type: demo row 7", 5).await.unwrap();

    let (loaded_vector_index, loaded_config) = store.load("fifty_rows", "stub-embedding-v1").unwrap();
    let bm25_after = BM25Index::build(loaded_vector_index.corpus().clone());
    let after_fusion = FusionConfig {
        bm25_weight: loaded_config.bm25_weight,
        vector_weight: loaded_config.vector_weight,
        rrf_k: loaded_config.rrf_k,
        top_k: loaded_config.top_k,
        rerank_top_k: loaded_config.top_k,
        enable_cache: true,
    };
    let after = HybridRetriever::new(bm25_after, loaded_vector_index, StubEmbeddingClient::new(48), after_fusion);
    let ranking_after = after.hybrid("type: demo row 7", 5).await.unwrap();

    assert_eq!(ranking_before.ids(), ranking_after.ids());
    for (a, b) in ranking_before.results.iter().zip(ranking_after.results.iter()) {
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

/// S6: NDCG sanity check. Gold set `["X"]`, predictions `["Y", "X", "Z"]` →
/// NDCG@1 = 0, NDCG@3 = `(1/log2(3)) / 1`.
#[test]
fn s6_ndcg_sanity_matches_the_closed_form_values() {
    use toolrouter::search::{RankedDocument, Ranking};

    let ranking = Ranking::new(vec![
        RankedDocument { document: row("Y", "row Y"), score: 3.0 },
        RankedDocument { document: row("X", "row X"), score: 2.0 },
        RankedDocument { document: row("Z", "row Z"), score: 1.0 },
    ]);
    let query = EvalQuery {
        query: "sanity check".to_string(),
        relevant_apis: vec!["X".to_string()],
    };

    assert_eq!(ndcg_at_k(&query, &ranking, 1), 0.0);

    let expected_ndcg_3 = (1.0f32 / 3.0f32.log2()) / 1.0;
    let actual = ndcg_at_k(&query, &ranking, 3);
    assert!((actual - expected_ndcg_3).abs() < 1e-4, "expected {expected_ndcg_3}, got {actual}");
}

async fn futures_embed(embedder: &StubEmbeddingClient, corpus: &Corpus) -> Vec<Vec<f32>> {
    let texts: Vec<String> = corpus.iter().map(|d| d.content.clone()).collect();
    embedder.embed(&texts).await.unwrap()
}

async fn build_retriever(rows: &[&str]) -> HybridRetriever<StubEmbeddingClient> {
    let corpus = Corpus::new(rows.iter().map(|r| Document::new(*r)).collect());
    let bm25 = BM25Index::build(corpus.clone());
    let embedder = StubEmbeddingClient::new(32);
    let vectors = futures_embed(&embedder, &corpus).await;
    let vector_index = FlatVectorIndex::build(corpus, vectors).unwrap();
    HybridRetriever::new(bm25, vector_index, embedder, FusionConfig::default())
}
