//! Vector Index (Flat L2), spec.md §4.4.
//!
//! Deliberately brute-force (spec.md §1 Non-goals exclude ANN at catalog
//! scale). Persistence reuses the teacher's little-endian byte-packing idiom
//! (`embeddings/storage.rs::parse_embedding`) generalized from per-row BLOBs
//! to a single flat buffer with an `(n, d)` header.

use std::io::{Read, Write};
use std::path::Path;

use async_trait::async_trait;

use crate::document::Corpus;
use crate::embeddings::EmbeddingClient;
use crate::error::{Result, RouterError};
use crate::search::{RankedDocument, Ranking};

/// Row-major `N x d` matrix of dense embeddings plus the corpus they're
/// aligned with (row index == corpus position).
#[derive(Debug, Clone, Default)]
pub struct FlatVectorIndex {
    corpus: Corpus,
    dimension: usize,
    rows: Vec<f32>,
}

impl FlatVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> usize {
        self.corpus.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Copies `N x d` floats; rejects inputs whose dimension is inconsistent
    /// (spec.md §4.4 `build(vectors)`).
    pub fn build(docs: Corpus, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if vectors.len() != docs.len() {
            return Err(RouterError::CorpusInvalid(format!(
                "expected {} vectors for {} documents, got {}",
                docs.len(),
                docs.len(),
                vectors.len()
            )));
        }
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut rows = Vec::with_capacity(vectors.len() * dimension);
        for (i, v) in vectors.into_iter().enumerate() {
            if v.len() != dimension {
                return Err(RouterError::CorpusInvalid(format!(
                    "vector at row {i} has dimension {}, expected {dimension}",
                    v.len()
                )));
            }
            rows.extend(v);
        }
        Ok(Self { corpus: docs, dimension, rows })
    }

    fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.rows[start..start + self.dimension]
    }

    /// Exact L2 search over all rows (spec.md §4.4 `topk`), ties broken by
    /// corpus position ascending.
    pub fn topk(&self, query_vector: &[f32], k: usize) -> Ranking {
        if self.corpus.is_empty() || query_vector.len() != self.dimension {
            return Ranking::default();
        }

        let mut distances: Vec<(usize, f32)> = (0..self.rows())
            .map(|i| (i, squared_l2(query_vector, self.row(i))))
            .collect();
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        distances.truncate(k);

        let results = distances
            .into_iter()
            .filter_map(|(i, dist)| {
                self.corpus.get(i).map(|doc| RankedDocument {
                    document: doc.clone(),
                    // Smaller L2 distance is better; expose a score where
                    // higher is more relevant, matching the Ranking contract.
                    score: -dist,
                })
            })
            .collect();

        Ranking::new(results)
    }

    /// Serializes the `(n, d)` header followed by the raw `f32` buffer as
    /// little-endian bytes. The corpus itself is NOT written here — it lives
    /// in `documents.bin`, written separately by `IndexStore` (spec.md §4.5:
    /// `vector.idx` and `documents.bin` are distinct bundle files). Byte-exact
    /// round trip (spec.md §4.4).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;

        file.write_all(&(self.rows() as u64).to_le_bytes())?;
        file.write_all(&(self.dimension as u64).to_le_bytes())?;
        for value in &self.rows {
            file.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads the matrix from `path` and re-attaches it to `corpus`, which the
    /// caller (`IndexStore`) loaded from `documents.bin` separately. Fails
    /// with `IndexIncompatible` if the header's row count disagrees with
    /// `corpus.len()` (spec.md §4.5 load validation).
    pub fn load(path: &Path, corpus: Corpus) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut buf8 = [0u8; 8];

        file.read_exact(&mut buf8)?;
        let n = u64::from_le_bytes(buf8) as usize;
        file.read_exact(&mut buf8)?;
        let dimension = u64::from_le_bytes(buf8) as usize;

        if corpus.len() != n {
            return Err(RouterError::IndexIncompatible(format!(
                "vector index header declares {n} rows but corpus has {} documents",
                corpus.len()
            )));
        }

        let mut rows = Vec::with_capacity(n * dimension);
        let mut buf4 = [0u8; 4];
        for _ in 0..(n * dimension) {
            file.read_exact(&mut buf4)?;
            rows.push(f32::from_le_bytes(buf4));
        }

        Ok(Self { corpus, dimension, rows })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Adapts `FlatVectorIndex` to the `Retriever` trait (spec.md §9) by
/// embedding the query text before searching. `FlatVectorIndex::topk` itself
/// takes a pre-embedded vector, since `HybridRetriever` already owns the
/// embedding step and reuses it across the bm25/vector/rerank legs.
pub struct VectorRetriever<E: EmbeddingClient> {
    index: FlatVectorIndex,
    embedder: E,
}

impl<E: EmbeddingClient> VectorRetriever<E> {
    pub fn new(index: FlatVectorIndex, embedder: E) -> Self {
        Self { index, embedder }
    }
}

#[async_trait]
impl<E: EmbeddingClient> super::Retriever for VectorRetriever<E> {
    async fn topk(&self, query: &str, k: usize) -> Result<Ranking> {
        let vectors = self.embedder.embed(std::slice::from_ref(&query.to_string())).await?;
        Ok(self.index.topk(&vectors[0], k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use tempfile::TempDir;

    fn corpus(n: usize) -> Corpus {
        Corpus::new((0..n).map(|i| Document::new(format!("doc-{i}"))).collect())
    }

    #[test]
    fn build_rejects_vector_count_mismatch() {
        let result = FlatVectorIndex::build(corpus(2), vec![vec![1.0, 0.0]]);
        assert!(matches!(result, Err(RouterError::CorpusInvalid(_))));
    }

    #[test]
    fn build_rejects_inconsistent_dimension() {
        let result = FlatVectorIndex::build(corpus(2), vec![vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(result, Err(RouterError::CorpusInvalid(_))));
    }

    #[test]
    fn topk_finds_nearest_neighbor_exactly() {
        let index = FlatVectorIndex::build(
            corpus(3),
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]],
        )
        .unwrap();
        let ranking = index.topk(&[0.9, 0.1], 1);
        assert_eq!(ranking.results[0].document.content, "doc-0");
    }

    #[test]
    fn topk_ties_break_by_corpus_position() {
        let index = FlatVectorIndex::build(corpus(2), vec![vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let ranking = index.topk(&[1.0, 0.0], 2);
        assert_eq!(ranking.results[0].document.content, "doc-0");
        assert_eq!(ranking.results[1].document.content, "doc-1");
    }

    #[test]
    fn save_load_round_trips_byte_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vector.idx");
        let index = FlatVectorIndex::build(
            corpus(50),
            (0..50).map(|i| vec![i as f32 * 0.1, (50 - i) as f32 * 0.2]).collect(),
        )
        .unwrap();
        index.save(&path).unwrap();
        let loaded = FlatVectorIndex::load(&path, corpus(50)).unwrap();

        assert_eq!(loaded.rows(), index.rows());
        assert_eq!(loaded.dimension(), index.dimension());
        let query = [2.0, 3.0];
        assert_eq!(loaded.topk(&query, 5).ids(), index.topk(&query, 5).ids());
        for (a, b) in loaded.topk(&query, 5).results.iter().zip(index.topk(&query, 5).results.iter()) {
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[test]
    fn load_rejects_header_corpus_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vector.idx");
        let index = FlatVectorIndex::build(corpus(2), vec![vec![1.0], vec![2.0]]).unwrap();
        index.save(&path).unwrap();

        // Corrupt the header's row count.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0..8].copy_from_slice(&(99u64).to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let result = FlatVectorIndex::load(&path, corpus(2));
        assert!(matches!(result, Err(RouterError::IndexIncompatible(_))));
    }

    #[test]
    fn topk_returns_empty_for_wrong_dimension_query() {
        let index = FlatVectorIndex::build(corpus(2), vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(index.topk(&[1.0, 0.0, 0.0], 5).is_empty());
    }

    #[tokio::test]
    async fn vector_retriever_embeds_the_query_then_searches() {
        use crate::search::Retriever;
        use crate::testing::StubEmbeddingClient;

        let index = FlatVectorIndex::build(corpus(2), vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let retriever = VectorRetriever::new(index, StubEmbeddingClient::new(2));
        let ranking = retriever.topk("anything", 2).await.unwrap();
        assert_eq!(ranking.len(), 2);
    }
}
