//! Cohere cross-encoder reranker.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::http::post_json;
use crate::error::{ConfigError, LabError, Result};
use crate::traits::store::{Reranker, SearchHit};

const PROVIDER: &str = "cohere";

/// Reorders hybrid candidates with a Cohere rerank model.
pub struct CohereReranker {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl CohereReranker {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: model.into(),
            base_url: "https://api.cohere.com/v1".to_string(),
        }
    }

    /// Create from environment variable `COHERE_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| ConfigError::MissingCredential("COHERE_API_KEY".into()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Reorder `candidates` by the returned relevance scores.
///
/// Candidates the provider did not score are dropped.
fn apply(candidates: Vec<SearchHit>, results: Vec<RerankResult>) -> Result<Vec<SearchHit>> {
    let mut slots: Vec<Option<SearchHit>> = candidates.into_iter().map(Some).collect();
    let mut reranked = Vec::with_capacity(results.len());
    for result in results {
        let mut hit = slots
            .get_mut(result.index)
            .and_then(Option::take)
            .ok_or_else(|| LabError::Store(format!("rerank index {} out of range", result.index)))?;
        hit.score = result.relevance_score;
        reranked.push(hit);
    }
    crate::stores::fusion::sort_by_score(&mut reranked);
    Ok(reranked)
}

#[async_trait]
impl Reranker for CohereReranker {
    fn name(&self) -> String {
        self.model.clone()
    }

    async fn rerank(&self, query: &str, candidates: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let url = format!("{}/rerank", self.base_url);
        let body = RerankRequest {
            model: &self.model,
            query,
            documents: candidates.iter().map(|hit| hit.text.as_str()).collect(),
            top_n: candidates.len(),
        };
        let response: RerankResponse =
            post_json(&self.client, PROVIDER, &url, &self.api_key, &body).await?;
        debug!(model = %self.model, candidates = candidates.len(), "Reranked");
        apply(candidates, response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str) -> SearchHit {
        SearchHit {
            chunk_id: id.to_string(),
            text: format!("text of {}", id),
            score: 0.0,
            lexical_score: None,
            vector_score: None,
        }
    }

    #[test]
    fn test_apply_orders_by_relevance() {
        let results = vec![
            RerankResult { index: 2, relevance_score: 0.9 },
            RerankResult { index: 0, relevance_score: 0.4 },
        ];
        let reranked = apply(vec![hit("a"), hit("b"), hit("c")], results).unwrap();

        let ids: Vec<&str> = reranked.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(reranked[0].score, 0.9);
    }

    #[test]
    fn test_apply_rejects_bad_index() {
        let results = vec![RerankResult { index: 5, relevance_score: 0.1 }];
        assert!(apply(vec![hit("a")], results).is_err());
    }
}
