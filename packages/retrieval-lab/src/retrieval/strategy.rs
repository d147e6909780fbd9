//! Named retrieval strategies.

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::stores::fusion::LinearCombination;
use crate::traits::store::Reranker;

/// A retrieval strategy the [`Retriever`](crate::Retriever) can run.
#[derive(Clone)]
pub enum Strategy {
    /// Lexical search over normalised query text
    FullText,
    /// Vector search over the query embedding
    Semantic,
    /// Fused lexical and vector search
    Hybrid,
    /// Hybrid candidates blended by vector weight
    LinearCombination(LinearCombination),
    /// Hybrid candidates reordered by an external reranker
    Rerank(Arc<dyn Reranker>),
    /// Lexical search restricted to the query's predicted category
    CategoryFiltered,
}

impl Strategy {
    /// Linear-combination strategy; `weight` is the vector share in [0, 1].
    pub fn linear_combination(weight: f32) -> Result<Self, ConfigError> {
        Ok(Strategy::LinearCombination(LinearCombination::new(weight)?))
    }

    pub fn rerank(reranker: Arc<dyn Reranker>) -> Self {
        Strategy::Rerank(reranker)
    }

    /// Name used as the report key.
    pub fn name(&self) -> String {
        match self {
            Strategy::FullText => "fts".to_string(),
            Strategy::Semantic => "vector".to_string(),
            Strategy::Hybrid => "hybrid".to_string(),
            Strategy::LinearCombination(combination) => combination.name(),
            Strategy::Rerank(reranker) => format!("rerank({})", reranker.name()),
            Strategy::CategoryFiltered => "category_filtered".to_string(),
        }
    }

    /// Whether query text is punctuation-stripped before searching.
    pub fn normalises_text(&self) -> bool {
        !matches!(self, Strategy::Semantic)
    }

    pub fn needs_embeddings(&self) -> bool {
        !matches!(self, Strategy::FullText | Strategy::CategoryFiltered)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strategy").field(&self.name()).finish()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
