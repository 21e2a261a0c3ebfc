//! `eval`: runs a labeled query set through the two-stage hierarchical
//! retriever and reports NDCG@{1,3,5} (spec.md §4.7, §4.8, §6 CLI surface).

use clap::Parser;
use toolrouter::embeddings::http::HttpEmbeddingClient;
use toolrouter::eval::{build_report, EvalQuery};
use toolrouter::rerank::http::HttpRerankerClient;
use toolrouter::search::bm25::BM25Index;
use toolrouter::search::hierarchical::HierarchicalRetriever;
use toolrouter::search::hybrid::FusionConfig;
use toolrouter::{Config, HybridRetriever, IndexStore};

/// Runs a query set and reports NDCG@{1,3,5}.
#[derive(Parser, Debug)]
#[command(name = "eval")]
struct Args {
    /// Test group index: 1, 2, or 3.
    test_group: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    if !(1..=3).contains(&args.test_group) {
        eprintln!("usage: eval <1|2|3>");
        std::process::exit(1);
    }

    let config = Config::load()?;

    let queries_path = format!("queries_G{}.json", args.test_group);
    let queries_json = std::fs::read_to_string(&queries_path)
        .map_err(|e| anyhow::anyhow!("failed to read {queries_path}: {e}"))?;
    let queries: Vec<EvalQuery> = serde_json::from_str(&queries_json)
        .map_err(|e| anyhow::anyhow!("invalid query set JSON in {queries_path}: {e}"))?;

    if queries.is_empty() {
        anyhow::bail!("no queries in {queries_path}");
    }
    println!("Running evaluation on {} queries (test group {})", queries.len(), args.test_group);

    let embedding_key = std::env::var(&config.embedding.api_key_env)?;
    let make_embedder = || {
        HttpEmbeddingClient::new(
            config.embedding.base_url.clone(),
            embedding_key.clone(),
            config.embedding.model.clone(),
            config.embedding.batch_size,
        )
    };

    let store = IndexStore::new(config.index.index_dir.clone());
    let (bm25_weight, vector_weight) = config.normalized_fusion_weights();

    let (coarse_vector, coarse_index_config) = store.load("type_service_index", &config.embedding.model)?;
    let coarse_bm25 = BM25Index::build(coarse_vector.corpus().clone());
    let coarse_fusion = FusionConfig {
        bm25_weight,
        vector_weight,
        rrf_k: coarse_index_config.rrf_k,
        top_k: config.search.stage1_top_k,
        rerank_top_k: config.search.rerank_top_k,
        enable_cache: config.search.enable_cache,
    };
    let coarse = HybridRetriever::new(coarse_bm25, coarse_vector, make_embedder(), coarse_fusion);

    let (fine_vector, fine_index_config) = store.load("type_service_tool_index", &config.embedding.model)?;
    let fine_bm25 = BM25Index::build(fine_vector.corpus().clone());
    let fine_fusion = FusionConfig {
        bm25_weight,
        vector_weight,
        rrf_k: fine_index_config.rrf_k,
        top_k: config.search.top_k,
        rerank_top_k: config.search.rerank_top_k,
        enable_cache: config.search.enable_cache,
    };
    let fine = HybridRetriever::new(fine_bm25, fine_vector, make_embedder(), fine_fusion);

    let rerank_key = std::env::var(&config.rerank.api_key_env)?;
    let reranker = HttpRerankerClient::new(config.rerank.base_url.clone(), rerank_key, config.rerank.model.clone());
    let retriever = HierarchicalRetriever::new(coarse, fine, Box::new(reranker), config.search.stage1_top_k);

    let k = 5_usize.max(config.search.top_k);
    let mut rankings = Vec::with_capacity(queries.len());
    for query in &queries {
        match retriever.search(&query.query, k).await {
            Ok(result) => rankings.push(result.ranking),
            Err(e) => {
                log::warn!("query '{}' failed ({e}), recording empty ranking", query.query);
                rankings.push(Default::default());
            }
        }
    }

    let report = build_report(&queries, &rankings);
    let out_path = format!("evaluation_results_G{}.json", args.test_group);
    report.write_to(out_path.as_ref())?;

    println!("NDCG@1: {:.4}  NDCG@3: {:.4}  NDCG@5: {:.4}", report.ndcg_1, report.ndcg_3, report.ndcg_5);
    println!("Precision@5: {:.4}  Recall@10: {:.4}  MRR: {:.4}", report.precision_5, report.recall_10, report.mrr);
    println!("Wrote {out_path}");

    Ok(())
}
