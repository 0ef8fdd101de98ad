//! TF-IDF vector space over section texts. Matches scikit-learn's
//! `TfidfVectorizer(stop_words="english", ngram_range=(1, n),
//! max_features=k)` defaults: raw counts, smoothed idf, L2 rows.

use crate::text::tfidf_tokens;
use std::collections::{BTreeMap, HashMap};

/// Sparse row sorted by feature index.
pub type SparseVec = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct TfidfIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    max_ngram: usize,
}

impl TfidfIndex {
    pub fn fit(texts: &[&str], max_features: usize, max_ngram: usize) -> Self {
        let max_ngram = max_ngram.max(1);
        let n_docs = texts.len() as f64;

        let mut term_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let counts = term_counts(text, max_ngram);
            for (term, n) in counts {
                *term_freq.entry(term.clone()).or_insert(0) += n;
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Most frequent terms win; ties fall back to alphabetical order.
        let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features.max(1));
        let mut kept: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        kept.sort();

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (i, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, i);
        }

        Self {
            vocabulary,
            idf,
            max_ngram,
        }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// L2-normalised tf-idf row for `text`. Terms outside the vocabulary
    /// are ignored.
    pub fn transform(&self, text: &str) -> SparseVec {
        let mut row: SparseVec = term_counts(text, self.max_ngram)
            .into_iter()
            .filter_map(|(term, n)| {
                self.vocabulary
                    .get(&term)
                    .map(|&i| (i, n as f64 * self.idf[i]))
            })
            .collect();
        row.sort_by_key(|(i, _)| *i);
        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|(_, v)| *v /= norm);
        }
        row
    }
}

/// Dot product of two sorted sparse rows; the cosine when both are
/// normalised.
pub fn cosine(a: &SparseVec, b: &SparseVec) -> f64 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

fn term_counts(text: &str, max_ngram: usize) -> HashMap<String, usize> {
    let tokens = tfidf_tokens(text);
    let mut counts = HashMap::new();
    for n in 1..=max_ngram {
        for gram in tokens.windows(n) {
            *counts.entry(gram.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}
