//! Retrieval Lab
//!
//! A harness for enriching a passage corpus with LLM-generated labels and
//! for comparing retrieval strategies against ground truth.
//!
//! # Design
//!
//! - Every model call goes through a [`ThrottledExecutor`]: a bounded
//!   admission gate around single attempts, wrapped by a jittered
//!   exponential-backoff retry. Results come back in input order.
//! - Collaborators (model client, embedder, vector store, topic model,
//!   reranker) are traits, built once per run and passed by reference.
//! - Model output is decoded into typed shapes; a bad shape is a
//!   retryable [`CallError::SchemaValidation`], never a panic.
//! - A failed item is reported as a failure, never as an empty result.
//!
//! # Usage
//!
//! ```rust,ignore
//! use retrieval_lab::{EnrichmentPipeline, ExecutorConfig, ThrottledExecutor};
//! use retrieval_lab::testing::MockClient;
//!
//! let client = MockClient::new();
//! let executor = ThrottledExecutor::new(&ExecutorConfig::new(10))?;
//! let pipeline = EnrichmentPipeline::new(&client, &executor);
//!
//! let tagged = pipeline.tag_queries(queries, &topic_model).await;
//! let (ok, failed) = tagged.into_partial();
//! ```
//!
//! # Modules
//!
//! - [`executor`] - Admission gate, retry decorator and batch executor
//! - [`pipeline`] - Enrichment transforms (tagging, categories, synthesis)
//! - [`retrieval`] - Retrieval strategies over a [`VectorStore`]
//! - [`eval`] - Recall/precision/MRR scoring and reports
//! - [`traits`] - Collaborator abstractions
//! - [`stores`] - In-memory vector store, BM25 and fusion
//! - [`labels`] - JSONL ground-truth artifacts
//! - [`testing`] - Mock collaborators for testing

pub mod error;
pub mod eval;
pub mod executor;
pub mod labels;
pub mod pipeline;
pub mod retrieval;
pub mod schema;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(any(feature = "openai", feature = "cohere"))]
pub mod ai;

// Re-export core types at crate root
pub use error::{BatchFailure, CallError, CallResult, ConfigError, ItemFailure, LabError, Result};
pub use eval::{score, Evaluation, EvaluationReport, Metric, MetricKey, MetricReport, StrategyReport};
pub use executor::{AdmissionGate, BatchOutcome, Retry, ThrottledExecutor};
pub use pipeline::{EnrichmentPipeline, MetadataRecord};
pub use retrieval::{strip_punctuation, Retriever, Strategy};
pub use schema::{decode, decode_str, Decoded, StructuredOutput};
pub use stores::{LinearCombination, MemoryStore};
pub use traits::{
    ai::{extract, Embedder, StructuredClient, StructuredRequest},
    store::{Filter, Reranker, SearchHit, SearchMode, SearchQuery, SearchRequest, VectorStore},
    topic::{KeywordTopics, TopicModel, OUTLIER_TOPIC},
};
pub use types::{
    config::{
        Cutoffs, EvalConfig, ExecutorConfig, FailurePolicy, InFlightPolicy, ModelConfig,
        RetryBudget, SearchConfig, DEFAULT_CUTOFFS,
    },
    document::{chunk_id, Document},
    enrichment::{
        Capability, CapabilityResponse, Category, CategoryResponse, Enriched, Metadata,
        QuestionAnswer, TaggedQuery,
    },
    query::{GroundTruth, LabeledQuery, RankedResult},
};
