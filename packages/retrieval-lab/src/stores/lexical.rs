//! BM25 full-text index.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Lowercased word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Term statistics for a set of documents, addressed by insertion position.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    term_freqs: Vec<HashMap<String, u32>>,
    lengths: Vec<u32>,
    doc_freq: HashMap<String, u32>,
    total_len: u64,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every text, in order.
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = Self::new();
        for text in texts {
            index.add(text);
        }
        index
    }

    /// Add a document and return its position.
    pub fn add(&mut self, text: &str) -> usize {
        let tokens = tokenize(text);
        let mut freqs: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *freqs.entry(token.clone()).or_default() += 1;
        }
        for term in freqs.keys() {
            *self.doc_freq.entry(term.clone()).or_default() += 1;
        }

        self.total_len += tokens.len() as u64;
        self.lengths.push(tokens.len() as u32);
        self.term_freqs.push(freqs);
        self.term_freqs.len() - 1
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 score of document `doc` for the query terms.
    pub fn score(&self, doc: usize, query_terms: &[String]) -> f32 {
        let (Some(freqs), Some(&len)) = (self.term_freqs.get(doc), self.lengths.get(doc)) else {
            return 0.0;
        };
        if self.total_len == 0 {
            return 0.0;
        }
        let avg_len = self.total_len as f32 / self.len() as f32;
        let norm = K1 * (1.0 - B + B * len as f32 / avg_len);

        query_terms
            .iter()
            .filter_map(|term| freqs.get(term).map(|&tf| (term, tf as f32)))
            .map(|(term, tf)| self.idf(term) * tf * (K1 + 1.0) / (tf + norm))
            .sum()
    }

    /// Unique query terms in first-seen order.
    pub fn query_terms(query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("What's RRF, anyway?"), vec!["what", "s", "rrf", "anyway"]);
        assert!(tokenize("?!").is_empty());
    }

    #[test]
    fn test_rare_terms_score_higher() {
        let index = LexicalIndex::build([
            "the cat sat on the mat",
            "the dog sat on the log",
            "the cat chased the dog",
        ]);

        let terms = LexicalIndex::query_terms("cat mat");
        let scores: Vec<f32> = (0..3).map(|d| index.score(d, &terms)).collect();

        assert!(scores[0] > scores[2]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_query_terms_dedup() {
        assert_eq!(LexicalIndex::query_terms("cat Cat dog"), vec!["cat", "dog"]);
    }

    #[test]
    fn test_out_of_range_doc_scores_zero() {
        let index = LexicalIndex::build(["alpha"]);
        assert_eq!(index.score(5, &["alpha".to_string()]), 0.0);
    }
}
