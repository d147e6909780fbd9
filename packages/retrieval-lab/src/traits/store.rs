//! Vector store and reranker abstractions.
//!
//! The store owns indexing and scoring. The harness only issues searches
//! and reads identifiers off the returned hits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Which index a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Lexical,
    Vector,
    Hybrid,
}

/// The query side of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Text(String),
    Vector(Vec<f32>),
    Hybrid { text: String, vector: Vec<f32> },
}

impl SearchQuery {
    pub fn mode(&self) -> SearchMode {
        match self {
            SearchQuery::Text(_) => SearchMode::Lexical,
            SearchQuery::Vector(_) => SearchMode::Vector,
            SearchQuery::Hybrid { .. } => SearchMode::Hybrid,
        }
    }

    /// Query text, if this search has one.
    pub fn text(&self) -> Option<&str> {
        match self {
            SearchQuery::Text(text) | SearchQuery::Hybrid { text, .. } => Some(text),
            SearchQuery::Vector(_) => None,
        }
    }
}

/// Predicate applied to passage metadata before ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    Eq { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        match self {
            Filter::Eq { field, value } => metadata.get(field) == Some(value),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq { field, value } => write!(f, "{} = '{}'", field, value),
        }
    }
}

/// A ranked record returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub text: String,

    /// Final relevance score (higher is better)
    pub score: f32,

    /// Raw lexical score, when the hit came from the lexical index
    pub lexical_score: Option<f32>,

    /// Raw vector similarity, when the hit came from the vector index
    pub vector_score: Option<f32>,
}

/// Reorders hybrid candidates with a second relevance signal.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> String;

    /// Return `candidates` reordered, best first. May drop candidates.
    async fn rerank(&self, query: &str, candidates: Vec<SearchHit>) -> Result<Vec<SearchHit>>;
}

/// A search against one table.
#[derive(Clone)]
pub struct SearchRequest {
    pub table: String,
    pub query: SearchQuery,
    pub filter: Option<Filter>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(table: impl Into<String>, query: SearchQuery, limit: usize) -> Self {
        Self {
            table: table.into(),
            query,
            filter: None,
            reranker: None,
            limit,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn mode(&self) -> SearchMode {
        self.query.mode()
    }
}

impl fmt::Debug for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRequest")
            .field("table", &self.table)
            .field("mode", &self.mode())
            .field("filter", &self.filter)
            .field("reranker", &self.reranker.as_ref().map(|r| r.name()))
            .field("limit", &self.limit)
            .finish()
    }
}

/// Serves lexical, vector and hybrid search. Safe for concurrent reads.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Hits ordered best first, at most `request.limit` of them.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

#[async_trait]
impl<S: VectorStore + ?Sized> VectorStore for Arc<S> {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        (**self).search(request).await
    }
}

/// Cosine similarity between two vectors; 0.0 on length mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
