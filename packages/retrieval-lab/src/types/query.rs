//! Evaluation queries, ground truth and ranked results.

use serde::{Deserialize, Serialize};

/// Identifiers known to be relevant for a query.
///
/// Single-label files store one id string, multi-label files a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroundTruth {
    Single(String),
    Many(Vec<String>),
}

impl GroundTruth {
    pub fn ids(&self) -> &[String] {
        match self {
            GroundTruth::Single(id) => std::slice::from_ref(id),
            GroundTruth::Many(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|g| g == id)
    }
}

impl From<&str> for GroundTruth {
    fn from(id: &str) -> Self {
        GroundTruth::Single(id.to_string())
    }
}

impl From<Vec<String>> for GroundTruth {
    fn from(ids: Vec<String>) -> Self {
        GroundTruth::Many(ids)
    }
}

/// A query, optionally labelled with the chunk ids that answer it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledQuery {
    pub query: String,

    #[serde(
        default,
        rename = "selected_chunk_ids",
        alias = "chunk_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub ground_truth: Option<GroundTruth>,

    /// Known category of the answering passage, when the label file has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LabeledQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ground_truth: None,
            category: None,
        }
    }

    pub fn with_ground_truth(mut self, truth: impl Into<GroundTruth>) -> Self {
        self.ground_truth = Some(truth.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Identifiers ordered by relevance; index 0 is the best match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedResult(Vec<String>);

impl RankedResult {
    /// Keep at most `top_k` identifiers.
    pub fn new(mut ids: Vec<String>, top_k: usize) -> Self {
        ids.truncate(top_k);
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `k` identifiers (fewer if the result is shorter).
    pub fn head(&self, k: usize) -> &[String] {
        &self.0[..k.min(self.0.len())]
    }
}

impl From<Vec<String>> for RankedResult {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}
