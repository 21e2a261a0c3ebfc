//! `build-index`: reads a tool catalog, embeds it, and persists the three
//! granularity index bundles (spec.md §4.2, §6).

use clap::Parser;
use toolrouter::catalog::{build_corpora, parse_catalog, Granularity};
use toolrouter::embeddings::http::HttpEmbeddingClient;
use toolrouter::embeddings::EmbeddingClient;
use toolrouter::index_store::IndexConfig;
use toolrouter::search::vector::FlatVectorIndex;
use toolrouter::{Config, IndexStore};

#[derive(Parser, Debug)]
#[command(name = "build-index")]
struct Args {
    /// Path to the tool catalog JSON (spec.md §6: array of {type, service, tool, ...}).
    #[arg(long, default_value = "catalog.json")]
    catalog: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::load()?;

    let catalog_json = std::fs::read_to_string(&args.catalog)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", args.catalog.display()))?;
    let rows = parse_catalog(&catalog_json)?;
    log::info!("loaded {} catalog rows from {}", rows.len(), args.catalog.display());

    let (type_service, type_service_tool, tool) = build_corpora(&rows);

    let api_key = std::env::var(&config.embedding.api_key_env)?;
    let embedder = HttpEmbeddingClient::new(
        config.embedding.base_url.clone(),
        api_key,
        config.embedding.model.clone(),
        config.embedding.batch_size,
    );

    let store = IndexStore::new(config.index.index_dir.clone());

    for (granularity, corpus) in [
        (Granularity::TypeService, type_service),
        (Granularity::TypeServiceTool, type_service_tool),
        (Granularity::Tool, tool),
    ] {
        let name = granularity.index_name();
        let started = std::time::Instant::now();

        let texts: Vec<String> = corpus.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        // BM25 isn't persisted: it's cheap to rebuild from documents.bin,
        // and the bundle layout only names documents.bin/vector.idx/config.json.
        let vector_index = FlatVectorIndex::build(corpus, vectors)?;

        let (bm25_weight, vector_weight) = config.normalized_fusion_weights();
        let index_config = IndexConfig {
            embedding_model: embedder.model_id().to_string(),
            top_k: config.search.top_k,
            bm25_weight,
            vector_weight,
            rrf_k: config.search.rrf_k,
        };
        store.save(name, &vector_index, &index_config)?;
        log::info!("built and saved '{name}' ({} rows) in {:?}", vector_index.rows(), started.elapsed());
    }

    println!("Index build complete: {}", config.index.index_dir.display());
    Ok(())
}
