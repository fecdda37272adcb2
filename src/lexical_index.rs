//! Lexical index with Okapi BM25 scoring.
//!
//! The index is built in one pass over the full fragment corpus and
//! replaced wholesale on rebuild; there are no incremental token updates.
//! Scoring follows the Okapi BM25 variant: the classic idf
//! `ln((N - df + 0.5) / (df + 0.5))` with negative values floored to
//! ε·avg_idf, k1 = 1.5, b = 0.75.
//!
//! A term match scoring zero carries no discriminative value, so
//! zero-or-negative hits are filtered out of search results entirely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{CodeTokenizer, Tokenizer};
use crate::error::Result;
use crate::storage::{self, Storage};
use crate::types::{Fid, ScoredFragment, sort_by_score_desc};

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
    /// Floor factor for negative idf values, as a fraction of the
    /// average idf.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Per-corpus BM25 statistics, built in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Bm25Stats {
    /// BM25 doc position -> fragment id, in build order.
    fids: Vec<Fid>,
    /// Term frequencies per document.
    doc_term_freqs: Vec<HashMap<String, u32>>,
    /// Token count per document.
    doc_lens: Vec<u32>,
    /// Average document length.
    avg_doc_len: f64,
    /// Precomputed idf per term, ε-floored.
    idf: HashMap<String, f64>,
    params: Bm25Params,
}

impl Bm25Stats {
    fn build(corpus: &[(Fid, Vec<String>)], params: Bm25Params) -> Self {
        let doc_count = corpus.len();
        let mut fids = Vec::with_capacity(doc_count);
        let mut doc_term_freqs = Vec::with_capacity(doc_count);
        let mut doc_lens = Vec::with_capacity(doc_count);
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for (fid, tokens) in corpus {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            fids.push(*fid);
            doc_lens.push(tokens.len() as u32);
            doc_term_freqs.push(freqs);
        }

        let avg_doc_len = if doc_count == 0 {
            0.0
        } else {
            doc_lens.iter().map(|&l| f64::from(l)).sum::<f64>() / doc_count as f64
        };

        // Okapi idf, with negative values floored to ε·avg_idf so rare
        // wording cannot be outvoted by terms present in most documents.
        let n = doc_count as f64;
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_freqs.len());
        let mut idf_sum = 0.0;
        let mut negative_terms: Vec<String> = Vec::new();
        for (term, df) in &doc_freqs {
            let value = ((n - f64::from(*df) + 0.5) / (f64::from(*df) + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative_terms.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        if !idf.is_empty() {
            let floor = params.epsilon * (idf_sum / idf.len() as f64);
            for term in negative_terms {
                idf.insert(term, floor);
            }
        }

        Self {
            fids,
            doc_term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
            params,
        }
    }

    /// BM25 score of one document against the query terms.
    fn score(&self, doc: usize, query_tokens: &[String]) -> f64 {
        let k1 = self.params.k1;
        let b = self.params.b;
        let doc_len = f64::from(self.doc_lens[doc]);
        let norm = 1.0 - b + b * doc_len / self.avg_doc_len;

        let mut score = 0.0;
        for token in query_tokens {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };
            let tf = f64::from(
                self.doc_term_freqs[doc]
                    .get(token)
                    .copied()
                    .unwrap_or_default(),
            );
            score += idf * (tf * (k1 + 1.0)) / (tf + k1 * norm);
        }
        score
    }
}

/// Bag-of-words BM25 index over the fragment corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalIndex {
    #[serde(skip)]
    tokenizer: CodeTokenizer,
    stats: Option<Bm25Stats>,
}

impl LexicalIndex {
    /// Create a new unbuilt index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in the built corpus.
    pub fn len(&self) -> usize {
        self.stats.as_ref().map_or(0, |s| s.fids.len())
    }

    /// Whether no corpus has been built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a fresh index over the full corpus of `(fid, text)` pairs.
    ///
    /// Replaces any previous contents. An empty corpus leaves the index in
    /// the empty state. Callers needing rebuilds to be atomic for
    /// concurrent readers build into a fresh `LexicalIndex` and swap it in.
    pub fn build(&mut self, corpus: &[(Fid, String)]) {
        if corpus.is_empty() {
            self.stats = None;
            info!("lexical corpus empty, index left unbuilt");
            return;
        }

        let tokenized: Vec<(Fid, Vec<String>)> = corpus
            .iter()
            .map(|(fid, text)| (*fid, self.tokenizer.tokenize(text)))
            .collect();

        self.stats = Some(Bm25Stats::build(&tokenized, Bm25Params::default()));
        info!(documents = corpus.len(), "lexical index built");
    }

    /// BM25 search, descending by score.
    ///
    /// Returns up to `k` hits with strictly positive scores; zero-score
    /// matches are excluded. An unbuilt or empty index returns an empty
    /// list.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredFragment> {
        let Some(stats) = &self.stats else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let query_tokens = self.tokenizer.tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<ScoredFragment> = (0..stats.fids.len())
            .filter_map(|doc| {
                let score = stats.score(doc, &query_tokens);
                (score > 0.0).then(|| ScoredFragment::new(stats.fids[doc], score as f32))
            })
            .collect();

        sort_by_score_desc(&mut hits);
        hits.truncate(k);
        hits
    }

    /// Persist the built statistics plus the fid-order mapping.
    ///
    /// Like the vector index, persisting an empty index is a guarded no-op
    /// so restarts cannot clobber durable history with nothing.
    pub fn persist(&self, storage: &dyn Storage, name: &str) -> Result<()> {
        if self.is_empty() {
            info!(snapshot = name, "lexical index empty, skipping persist");
            return Ok(());
        }
        storage::write_snapshot(storage, name, self)?;
        info!(snapshot = name, documents = self.len(), "lexical index persisted");
        Ok(())
    }

    /// Restore an index from a snapshot, if one exists.
    pub fn restore(storage: &dyn Storage, name: &str) -> Result<Option<Self>> {
        let Some(index) = storage::read_snapshot::<Self>(storage, name)? else {
            return Ok(None);
        };
        info!(snapshot = name, documents = index.len(), "lexical index restored");
        Ok(Some(index))
    }
}
