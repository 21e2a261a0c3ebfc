//! `query`: route a single natural-language query against persisted indexes
//! (spec.md §4.6, §4.7, §6). Defaults to the production two-stage
//! hierarchical path; `--flat` instead searches one granularity index
//! directly, for debugging a single index in isolation.

use clap::Parser;
use toolrouter::embeddings::http::HttpEmbeddingClient;
use toolrouter::rerank::http::HttpRerankerClient;
use toolrouter::rerank::RerankerClient;
use toolrouter::search::bm25::BM25Index;
use toolrouter::search::hierarchical::HierarchicalRetriever;
use toolrouter::search::hybrid::FusionConfig;
use toolrouter::{Config, HybridRetriever, IndexStore};

#[derive(Parser, Debug)]
#[command(name = "query")]
struct Args {
    /// The natural-language query to route.
    query: String,

    /// Search a single granularity index directly instead of the two-stage
    /// hierarchical path.
    #[arg(long)]
    flat: bool,

    /// Which granularity index to search in `--flat` mode.
    #[arg(long, default_value = "type_service_tool_index")]
    index: String,

    /// Number of results to return.
    #[arg(long)]
    k: Option<usize>,

    /// Apply the neural reranker to the fused results (`--flat` mode only;
    /// hierarchical search always reranks).
    #[arg(long)]
    rerank: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::load()?;
    let k = args.k.unwrap_or(config.search.top_k);

    if args.flat {
        return run_flat(&args, &config, k).await;
    }

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
    let result = retriever.search(&args.query, k).await?;

    for (rank, ranked) in result.ranking.results.iter().enumerate() {
        println!("{:>2}. [{:.4}] {}", rank + 1, ranked.score, ranked.document.content);
    }

    Ok(())
}

async fn run_flat(args: &Args, config: &toolrouter::Config, k: usize) -> anyhow::Result<()> {
    let embedding_key = std::env::var(&config.embedding.api_key_env)?;
    let embedder = HttpEmbeddingClient::new(
        config.embedding.base_url.clone(),
        embedding_key,
        config.embedding.model.clone(),
        config.embedding.batch_size,
    );

    let store = IndexStore::new(config.index.index_dir.clone());
    let (vector_index, index_config) = store.load(&args.index, &config.embedding.model)?;
    let bm25 = BM25Index::build(vector_index.corpus().clone());

    let (bm25_weight, vector_weight) = config.normalized_fusion_weights();
    let fusion = FusionConfig {
        bm25_weight,
        vector_weight,
        rrf_k: index_config.rrf_k,
        top_k: index_config.top_k,
        rerank_top_k: config.search.rerank_top_k,
        enable_cache: config.search.enable_cache,
    };

    let mut retriever = HybridRetriever::new(bm25, vector_index, embedder, fusion);
    if args.rerank {
        let rerank_key = std::env::var(&config.rerank.api_key_env)?;
        let reranker = HttpRerankerClient::new(config.rerank.base_url.clone(), rerank_key, config.rerank.model.clone());
        retriever = retriever.with_reranker(Box::new(reranker) as Box<dyn RerankerClient>);
    }

    let ranking = if args.rerank {
        retriever.hybrid_rerank(&args.query, k).await?
    } else {
        retriever.hybrid(&args.query, k).await?
    };

    for (rank, ranked) in ranking.results.iter().enumerate() {
        println!("{:>2}. [{:.4}] {}", rank + 1, ranked.score, ranked.document.content);
    }

    Ok(())
}
