//! Configuration: `toml`-deserialized, one sub-struct per concern, validated
//! at load time (spec.md §6). Grounded on the teacher's `Config::load()`
//! idiom (`ROUTER_CONFIG` env var override, `.env` via `dotenv`).

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Result, RouterError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub search: SearchConfig,
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub bm25_weight: f32,
    pub vector_weight: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
    #[serde(default)]
    pub enable_cache: bool,
    /// Stage-1 (coarse) candidate count for `HierarchicalRetriever` (spec.md
    /// §4.7). Stage 2 searches the fine index at `2 * stage1_top_k`.
    #[serde(default = "default_stage1_top_k")]
    pub stage1_top_k: usize,
}

fn default_top_k() -> usize {
    10
}

fn default_rerank_top_k() -> usize {
    5
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_stage1_top_k() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub index_dir: PathBuf,
}

impl Config {
    /// Loads `.env` (if present), then the TOML file at `ROUTER_CONFIG` or
    /// `./config.toml`, and validates it.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("ROUTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            RouterError::Config(format!("failed to read config file {}: {e}", config_path.display()))
        })?;

        let config: Config = toml::from_str(&config_str)
            .map_err(|e| RouterError::Config(format!("failed to parse {}: {e}", config_path.display())))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects non-positive fusion weights (spec.md §6 Open Question
    /// resolution, see DESIGN.md) and other structurally-invalid values.
    fn validate(&self) -> Result<()> {
        if self.search.bm25_weight <= 0.0 {
            return Err(RouterError::Config("search.bm25_weight must be greater than 0".to_string()));
        }
        if self.search.vector_weight <= 0.0 {
            return Err(RouterError::Config("search.vector_weight must be greater than 0".to_string()));
        }
        if self.search.top_k == 0 {
            return Err(RouterError::Config("search.top_k must be greater than 0".to_string()));
        }
        if self.search.rrf_k <= 0.0 {
            return Err(RouterError::Config("search.rrf_k must be greater than 0".to_string()));
        }

        std::env::var(&self.embedding.api_key_env).map_err(|_| {
            RouterError::Config(format!(
                "environment variable {} not set (embedding API key)",
                self.embedding.api_key_env
            ))
        })?;
        std::env::var(&self.rerank.api_key_env).map_err(|_| {
            RouterError::Config(format!(
                "environment variable {} not set (rerank API key)",
                self.rerank.api_key_env
            ))
        })?;

        Ok(())
    }

    /// Fusion weights normalized to sum to 1.0 (spec.md §6: "fusion
    /// weights; normalized before use").
    pub fn normalized_fusion_weights(&self) -> (f32, f32) {
        let total = self.search.bm25_weight + self.search.vector_weight;
        (self.search.bm25_weight / total, self.search.vector_weight / total)
    }
}
