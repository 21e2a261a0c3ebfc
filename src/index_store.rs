//! Index Store: on-disk persistence of a named index bundle (spec.md §4.5).
//!
//! Writes `index_dir/<name>/{documents.bin, vector.idx, config.json}` by
//! building into a sibling temp directory and renaming atomically over the
//! target, the file-bundle analog of the teacher's WAL-durability concern.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::Corpus;
use crate::error::{Result, RouterError};
use crate::search::FlatVectorIndex;

/// `config.json`'s recognized keys (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    pub embedding_model: String,
    pub top_k: usize,
    pub bm25_weight: f32,
    pub vector_weight: f32,
    pub rrf_k: f32,
}

pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bundle_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Writes the three bundle files into a sibling temp directory, then
    /// renames it over the target directory in one step so a reader never
    /// observes a partial bundle (spec.md §3 "partial bundles must not be
    /// loadable").
    pub fn save(&self, name: &str, vector_index: &FlatVectorIndex, config: &IndexConfig) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let target = self.bundle_dir(name);
        let tmp = self.root.join(format!(".{name}.tmp-{}", std::process::id()));

        if tmp.exists() {
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;

        let documents_path = tmp.join("documents.bin");
        let documents_bytes = serde_json::to_vec(vector_index.corpus())?;
        std::fs::write(&documents_path, documents_bytes)?;

        vector_index.save(&tmp.join("vector.idx"))?;

        let config_bytes = serde_json::to_vec_pretty(config)?;
        std::fs::write(tmp.join("config.json"), config_bytes)?;

        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Rehydrates all three files, validating `documents.len() ==
    /// vector_index.rows()` and the embedding model id against `expected_model`.
    /// Fails `IndexIncompatible` on mismatch (spec.md §4.5).
    pub fn load(&self, name: &str, expected_model: &str) -> Result<(FlatVectorIndex, IndexConfig)> {
        let dir = self.bundle_dir(name);
        if !dir.is_dir() {
            return Err(RouterError::IndexIncompatible(format!(
                "missing index bundle directory: {}",
                dir.display()
            )));
        }

        let documents_bytes = std::fs::read(dir.join("documents.bin"))?;
        let corpus: Corpus = serde_json::from_slice(&documents_bytes)?;

        let config_bytes = std::fs::read(dir.join("config.json"))?;
        let config: IndexConfig = serde_json::from_slice(&config_bytes)?;

        if config.embedding_model != expected_model {
            return Err(RouterError::IndexIncompatible(format!(
                "bundle '{name}' was built with embedding model '{}', configured client uses '{expected_model}'",
                config.embedding_model
            )));
        }

        let vector_index = FlatVectorIndex::load(&dir.join("vector.idx"), corpus)?;

        Ok((vector_index, config))
    }

    pub fn bundle_exists(&self, name: &str) -> bool {
        self.bundle_dir(name).is_dir()
    }
}
