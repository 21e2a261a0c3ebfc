//! Lexical Index (BM25 Okapi), spec.md §4.3.
//!
//! Grounded on `rank-retrieve`'s inverted-index shape (term → posting list
//! of `(doc_id, term_frequency)`, per-doc length, average document length)
//! and the original's `BM25Okapi` parameterization (`k1=1.2`, `b=0.75`).

use std::collections::HashMap;

use crate::document::{Corpus, Document};
use crate::error::Result;
use crate::search::{RankedDocument, Ranking};
use crate::tokenize::Tokenizer;

const K1: f32 = 1.2;
const B: f32 = 0.75;

#[derive(Debug, Clone, Default)]
struct Posting {
    doc_id: usize,
    term_frequency: u32,
}

/// In-memory Okapi BM25 scorer over an owned corpus.
#[derive(Debug, Default)]
pub struct BM25Index {
    corpus: Corpus,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
}

impl BM25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizes every document once and populates the inverted index
    /// (spec.md §4.3 `build(docs)`, cost O(total tokens)).
    pub fn build(docs: Corpus) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(docs.len());

        for (doc_id, doc) in docs.iter().enumerate() {
            let tokens = tokenize(doc);
            doc_lengths.push(tokens.len() as u32);

            let mut term_counts: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_counts.entry(token).or_insert(0) += 1;
            }
            for (term, term_frequency) in term_counts {
                postings.entry(term).or_default().push(Posting { doc_id, term_frequency });
            }
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<u32>() as f32 / doc_lengths.len() as f32
        };

        Self {
            corpus: docs,
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.corpus.len() as f32;
        let df = self.postings.get(term).map(|p| p.len()).unwrap_or(0) as f32;
        // Standard Robertson/Sparck-Jones IDF with +1 smoothing to keep it
        // non-negative for common terms.
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Returns the `k` documents with highest BM25 score for `query`, ties
    /// broken by corpus position ascending (spec.md §4.3 invariant).
    pub fn topk(&self, query: &str, k: usize) -> Ranking {
        if self.corpus.is_empty() || query.trim().is_empty() {
            return Ranking::default();
        }

        let tokenizer = Tokenizer::detect(query);
        let query_terms = tokenizer.tokenize(query);

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            for posting in postings {
                let doc_len = self.doc_lengths[posting.doc_id] as f32;
                let tf = posting.term_frequency as f32;
                let denom = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_length.max(1.0));
                let score = idf * (tf * (K1 + 1.0)) / denom.max(f32::EPSILON);
                *scores.entry(posting.doc_id).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);

        let results = ranked
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.corpus.get(doc_id).map(|doc| RankedDocument {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();

        Ranking::new(results)
    }
}

fn tokenize(doc: &Document) -> Vec<String> {
    Tokenizer::detect(&doc.content).tokenize(&doc.content)
}

#[async_trait::async_trait]
impl super::Retriever for BM25Index {
    async fn topk(&self, query: &str, k: usize) -> Result<Ranking> {
        Ok(self.topk(query, k))
    }
}
