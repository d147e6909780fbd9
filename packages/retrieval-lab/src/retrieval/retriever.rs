//! Runs retrieval strategies over a query set.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{CallError, ConfigError, LabError, Result};
use crate::pipeline::EnrichmentPipeline;
use crate::retrieval::normalize::strip_punctuation;
use crate::retrieval::strategy::Strategy;
use crate::stores::fusion::LinearCombination;
use crate::traits::ai::{Embedder, StructuredClient};
use crate::traits::store::{Filter, Reranker, SearchQuery, SearchRequest, VectorStore};
use crate::types::config::SearchConfig;
use crate::types::enrichment::Category;
use crate::types::query::RankedResult;

/// Issues one search per query against a [`VectorStore`].
///
/// Every search function returns one [`RankedResult`] per query, in query
/// order, each holding at most `top_k` chunk ids.
pub struct Retriever<'a, S: ?Sized, E: ?Sized> {
    store: &'a S,
    embedder: &'a E,
    config: SearchConfig,

    /// Predicted category per query text, for the category prefilter
    categories: HashMap<String, Category>,
}

impl<'a, S, E> Retriever<'a, S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(
        store: &'a S,
        embedder: &'a E,
        config: SearchConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            embedder,
            config,
            categories: HashMap::new(),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Use known categories for the category prefilter.
    pub fn with_query_categories(mut self, categories: HashMap<String, Category>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn query_category(&self, query: &str) -> Option<Category> {
        self.categories.get(query).copied()
    }

    /// Classify the queries that have no category yet.
    ///
    /// Any item that exhausts its retries fails the whole call; a query is
    /// never searched under a guessed category.
    pub async fn classify_queries<C>(
        &mut self,
        pipeline: &EnrichmentPipeline<'_, C>,
        queries: &[String],
    ) -> Result<usize>
    where
        C: StructuredClient + ?Sized,
    {
        let mut pending: Vec<String> = Vec::new();
        for query in queries {
            if !self.categories.contains_key(query) && !pending.contains(query) {
                pending.push(query.clone());
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let labelled = pipeline.classify_queries(pending).await.into_result()?;
        let classified = labelled.len();
        for record in labelled {
            debug!(query = %record.source, category = %record.response, "Classified query");
            self.categories.insert(record.source, record.response);
        }
        Ok(classified)
    }

    /// Run `strategy` for every query.
    pub async fn search(
        &self,
        strategy: &Strategy,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedResult>> {
        if top_k == 0 {
            return Err(ConfigError::InvalidTopK.into());
        }
        debug!(strategy = %strategy, queries = queries.len(), top_k, "Running strategy");

        let results = match strategy {
            Strategy::FullText => self.full_text_search(queries, top_k).await,
            Strategy::Semantic => self.semantic_search(queries, top_k).await,
            Strategy::Hybrid => self.hybrid_search(queries, top_k).await,
            Strategy::LinearCombination(combination) => {
                self.reranked_search(queries, top_k, Arc::new(*combination))
                    .await
            }
            Strategy::Rerank(reranker) => {
                self.reranked_search(queries, top_k, Arc::clone(reranker))
                    .await
            }
            Strategy::CategoryFiltered => self.category_filtered_search(queries, top_k).await,
        }?;

        info!(strategy = %strategy, queries = results.len(), "Strategy complete");
        Ok(results)
    }

    /// Lexical search over punctuation-stripped query text.
    pub async fn full_text_search(&self, queries: &[String], top_k: usize) -> Result<Vec<RankedResult>> {
        let requests = queries
            .iter()
            .map(|query| self.request(SearchQuery::Text(strip_punctuation(query)), top_k))
            .collect();
        self.run_requests(requests, top_k).await
    }

    /// Vector search over query embeddings, embedded in batches.
    pub async fn semantic_search(&self, queries: &[String], top_k: usize) -> Result<Vec<RankedResult>> {
        let vectors = self.embed_queries(queries).await?;
        let requests = vectors
            .into_iter()
            .map(|vector| self.request(SearchQuery::Vector(vector), top_k))
            .collect();
        self.run_requests(requests, top_k).await
    }

    /// Store-side fusion of lexical and vector results.
    pub async fn hybrid_search(&self, queries: &[String], top_k: usize) -> Result<Vec<RankedResult>> {
        let requests = self.hybrid_requests(queries, top_k).await?;
        self.run_requests(requests, top_k).await
    }

    /// Hybrid candidates blended with vector share `weight`.
    pub async fn linear_combination_search(
        &self,
        queries: &[String],
        top_k: usize,
        weight: f32,
    ) -> Result<Vec<RankedResult>> {
        let combination = LinearCombination::new(weight)?;
        self.reranked_search(queries, top_k, Arc::new(combination))
            .await
    }

    /// Hybrid candidates reordered by `reranker`.
    pub async fn reranked_search(
        &self,
        queries: &[String],
        top_k: usize,
        reranker: Arc<dyn Reranker>,
    ) -> Result<Vec<RankedResult>> {
        let requests = self
            .hybrid_requests(queries, top_k)
            .await?
            .into_iter()
            .map(|request| request.with_reranker(Arc::clone(&reranker)))
            .collect();
        self.run_requests(requests, top_k).await
    }

    /// Lexical search restricted to each query's predicted category.
    ///
    /// Fails with `Unclassified` for a query that has no category; run
    /// [`classify_queries`](Self::classify_queries) first.
    pub async fn category_filtered_search(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedResult>> {
        let requests = queries
            .iter()
            .map(|query| {
                let category = self
                    .query_category(query)
                    .ok_or_else(|| LabError::Unclassified(query.clone()))?;
                Ok(self
                    .request(SearchQuery::Text(strip_punctuation(query)), top_k)
                    .with_filter(Filter::eq(&self.config.category_field, category.label())))
            })
            .collect::<Result<Vec<_>>>()?;
        self.run_requests(requests, top_k).await
    }

    fn request(&self, query: SearchQuery, top_k: usize) -> SearchRequest {
        SearchRequest::new(&self.config.table, query, top_k)
    }

    async fn hybrid_requests(&self, queries: &[String], top_k: usize) -> Result<Vec<SearchRequest>> {
        let texts: Vec<String> = queries.iter().map(|q| strip_punctuation(q)).collect();
        let vectors = self.embed_queries(&texts).await?;
        Ok(texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| self.request(SearchQuery::Hybrid { text, vector }, top_k))
            .collect())
    }

    async fn embed_queries(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embedding_batch_size) {
            let embedded = self.embedder.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(CallError::Api(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                ))
                .into());
            }
            vectors.extend(embedded);
        }
        debug!(queries = texts.len(), "Embedded queries");
        Ok(vectors)
    }

    async fn run_requests(&self, requests: Vec<SearchRequest>, top_k: usize) -> Result<Vec<RankedResult>> {
        stream::iter(requests)
            .map(|request| async move {
                let hits = self.store.search(&request).await?;
                let ids = hits.into_iter().map(|hit| hit.chunk_id).collect();
                Ok::<_, LabError>(RankedResult::new(ids, top_k))
            })
            .buffered(self.config.search_concurrency)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ThrottledExecutor;
    use crate::stores::MemoryStore;
    use crate::testing::{MockClient, MockEmbedder, MockReranker};
    use crate::types::config::{ExecutorConfig, RetryBudget};
    use crate::types::document::Document;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                "passages",
                vec![
                    (
                        Document::with_id("a", "whats new in rust async").with_field("category", "cs.AI"),
                        Some(vec![1.0, 0.0]),
                    ),
                    (
                        Document::with_id("b", "ranking with bm25 and rust").with_field("category", "cs.IR"),
                        Some(vec![0.0, 1.0]),
                    ),
                    (
                        Document::with_id("c", "gaussian processes").with_field("category", "stat.ML"),
                        Some(vec![0.6, 0.8]),
                    ),
                ],
            )
            .unwrap();
        store
    }

    fn queries(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_full_text_normalises_punctuation() {
        let store = store();
        let embedder = MockEmbedder::new(2);
        let retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

        let results = retriever
            .full_text_search(&queries(&["what's"]), 5)
            .await
            .unwrap();

        assert_eq!(results[0].ids(), ["a".to_string()]);
        assert!(embedder.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_semantic_embeds_in_batches_and_keeps_order() {
        let store = store();
        let embedder = MockEmbedder::new(2)
            .with_embedding("q1", vec![0.0, 1.0])
            .with_embedding("q2", vec![1.0, 0.0])
            .with_embedding("q3", vec![0.6, 0.8]);
        let config = SearchConfig::default().with_embedding_batch_size(2);
        let retriever = Retriever::new(&store, &embedder, config).unwrap();

        let results = retriever
            .semantic_search(&queries(&["q1", "q2", "q3"]), 1)
            .await
            .unwrap();

        assert_eq!(embedder.batch_sizes(), vec![2, 1]);
        let top: Vec<&str> = results.iter().map(|r| r.ids()[0].as_str()).collect();
        assert_eq!(top, vec!["b", "a", "c"]);
        assert!(results.iter().all(|r| r.len() == 1));
    }

    #[tokio::test]
    async fn test_rerank_strategy_sees_normalised_query() {
        let store = store();
        let embedder = MockEmbedder::new(2).with_embedding("rust", vec![1.0, 0.0]);
        let retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();
        let reranker = MockReranker::new();

        let fused = retriever.hybrid_search(&queries(&["rust!"]), 3).await.unwrap();
        let reranked = retriever
            .search(&Strategy::rerank(Arc::new(reranker.clone())), &queries(&["rust!"]), 3)
            .await
            .unwrap();

        let mut reversed = fused[0].ids().to_vec();
        reversed.reverse();
        assert_eq!(reranked[0].ids(), reversed.as_slice());
        assert_eq!(reranker.queries(), vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn test_linear_combination_full_vector_weight() {
        let store = store();
        let embedder = MockEmbedder::new(2).with_embedding("rust", vec![0.0, 1.0]);
        let retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

        let results = retriever
            .linear_combination_search(&queries(&["rust"]), 1, 1.0)
            .await
            .unwrap();
        assert_eq!(results[0].ids(), ["b".to_string()]);

        assert!(matches!(
            retriever.linear_combination_search(&queries(&["rust"]), 1, -0.1).await,
            Err(LabError::Config(ConfigError::InvalidWeight(_)))
        ));
    }

    #[tokio::test]
    async fn test_category_prefilter_from_classifier() {
        let store = store();
        let embedder = MockEmbedder::new(2);
        let client = MockClient::new()
            .with_response("bm25", json!({ "category": "cs.AI" }));
        let executor =
            ThrottledExecutor::new(&ExecutorConfig::new(2).with_retry(RetryBudget::immediate(1)))
                .unwrap();
        let pipeline = EnrichmentPipeline::new(&client, &executor);
        let mut retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

        let queries = queries(&["rust bm25"]);
        assert!(matches!(
            retriever.category_filtered_search(&queries, 5).await,
            Err(LabError::Unclassified(_))
        ));

        assert_eq!(retriever.classify_queries(&pipeline, &queries).await.unwrap(), 1);
        let filtered = retriever
            .search(&Strategy::CategoryFiltered, &queries, 5)
            .await
            .unwrap();
        let unfiltered = retriever.full_text_search(&queries, 5).await.unwrap();

        assert_eq!(filtered[0].ids(), ["a".to_string()]);
        assert_eq!(unfiltered[0].len(), 2);

        // Already classified queries are not sent again.
        assert_eq!(retriever.classify_queries(&pipeline, &queries).await.unwrap(), 0);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let store = store();
        let embedder = MockEmbedder::new(2);
        let retriever = Retriever::new(&store, &embedder, SearchConfig::default()).unwrap();

        assert!(matches!(
            retriever.search(&Strategy::FullText, &queries(&["rust"]), 0).await,
            Err(LabError::Config(ConfigError::InvalidTopK))
        ));
    }
}
