//! TF-IDF lexical index with cosine-similarity lookup
//!
//! Weights follow the usual smoothed scheme:
//!
//! ```text
//! tf(t, d)  = raw count of t in d
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(t, d)   = tf(t, d) * idf(t), then L2-normalised per document
//! cos(q, d) = q · d
//! ```
//!
//! The index is immutable once built; rebuilding means building a new one.

use super::tokenizer::tokenize;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Sparse, L2-normalised document vector sorted by term id
type SparseVector = Vec<(usize, f64)>;

/// A scored lookup result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch {
    /// Position of the best line in the fitted corpus
    pub index: usize,
    /// Cosine similarity in [0, 1]
    pub score: f64,
}

/// Fitted TF-IDF vector space
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: Vec<SparseVector>,
}

impl LexicalIndex {
    /// Fit the index, one document per line
    pub fn build<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let tokenized: Vec<Vec<String>> = lines.iter().map(|l| tokenize(l.as_ref())).collect();

        // Term ids in first-seen order keep the fit deterministic
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen_in_doc = std::collections::HashSet::new();
            for token in tokens {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id == df.len() {
                    df.push(0);
                }
                if seen_in_doc.insert(id) {
                    df[id] += 1;
                }
            }
        }

        if vocabulary.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let n = lines.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let mut index = Self {
            vocabulary,
            idf,
            documents: Vec::with_capacity(lines.len()),
        };
        for tokens in &tokenized {
            let vector = index.vectorize(tokens);
            index.documents.push(vector);
        }

        tracing::debug!(
            documents = index.documents.len(),
            vocabulary = index.vocabulary.len(),
            "Lexical index fitted"
        );
        Ok(index)
    }

    /// Weight tokens against the fitted vocabulary; unknown terms are dropped
    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.vocabulary.get(token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();
        vector.sort_unstable_by_key(|&(id, _)| id);

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in vector.iter_mut() {
                *w /= norm;
            }
        }
        vector
    }

    /// Best-matching line for `text`; the first maximum wins
    pub fn query(&self, text: &str) -> ScoredMatch {
        let query = self.vectorize(&tokenize(text));
        let mut best = ScoredMatch {
            index: 0,
            score: 0.0,
        };
        if query.is_empty() {
            return best;
        }

        for (i, doc) in self.documents.iter().enumerate() {
            let score = dot(&query, doc);
            if score > best.score {
                best = ScoredMatch { index: i, score };
            }
        }
        // Rounding can push self-similarity a hair past 1
        best.score = best.score.min(1.0);
        best
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Dot product of two id-sorted sparse vectors
fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
