//! Batch enrichment pipeline.
//!
//! Every transform has the same shape: one structured call per item, run
//! through the [`ThrottledExecutor`], producing one record per input that
//! keeps its source index and a copy of its source. The transforms differ
//! only in model, prompt and response shape:
//!
//! - Capability tagging of queries ([`EnrichmentPipeline::tag_queries`])
//! - Category classification ([`EnrichmentPipeline::classify`])
//! - Synthetic question/answer and metadata generation
//!   ([`EnrichmentPipeline::generate_questions`],
//!   [`EnrichmentPipeline::generate_metadata`])

pub mod capability;
pub mod category;
pub mod prompts;
pub mod synthetic;

pub use synthetic::MetadataRecord;

use tokio_util::sync::CancellationToken;

use crate::executor::{BatchOutcome, ThrottledExecutor};
use crate::schema::StructuredOutput;
use crate::traits::ai::{extract, StructuredClient};
use crate::types::config::ModelConfig;
use crate::types::enrichment::Enriched;

/// Runs enrichment transforms against an injected client.
///
/// Both collaborators are borrowed for the lifetime of the pipeline; build
/// them once per run and pass them in.
pub struct EnrichmentPipeline<'a, C: ?Sized> {
    client: &'a C,
    executor: &'a ThrottledExecutor,
    models: ModelConfig,
    cancel: CancellationToken,
}

impl<'a, C> EnrichmentPipeline<'a, C>
where
    C: StructuredClient + ?Sized,
{
    pub fn new(client: &'a C, executor: &'a ThrottledExecutor) -> Self {
        Self {
            client,
            executor,
            models: ModelConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_models(mut self, models: ModelConfig) -> Self {
        self.models = models;
        self
    }

    /// Stop admitting calls once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    /// Apply one structured call per item.
    ///
    /// `user_prompt` renders the item; the decoded response is paired with
    /// the item and its position in `items`.
    pub async fn enrich<S, R, P>(
        &self,
        items: Vec<S>,
        model: &str,
        system_prompt: &str,
        user_prompt: P,
    ) -> BatchOutcome<Enriched<S, R>>
    where
        S: Clone,
        R: StructuredOutput,
        P: Fn(&S) -> String,
    {
        let indexed: Vec<(usize, S)> = items.into_iter().enumerate().collect();
        let user_prompt = &user_prompt;

        self.executor
            .run_until(
                indexed,
                |(index, source)| async move {
                    let prompt = user_prompt(&source);
                    let response: R = extract(self.client, model, system_prompt, &prompt).await?;
                    Ok(Enriched::new(index, source, response))
                },
                &self.cancel,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallError, LabError};
    use crate::testing::MockClient;
    use crate::types::config::{ExecutorConfig, RetryBudget};
    use crate::types::enrichment::QuestionAnswer;
    use serde_json::json;
    use std::time::Duration;

    fn executor(max_concurrency: usize) -> ThrottledExecutor {
        ThrottledExecutor::new(
            &ExecutorConfig::new(max_concurrency).with_retry(RetryBudget::immediate(3)),
        )
        .unwrap()
    }

    fn qa(question: &str) -> serde_json::Value {
        json!({ "chain_of_thought": "c", "question": question, "answer": "a" })
    }

    #[tokio::test(start_paused = true)]
    async fn test_outputs_trace_back_to_sources() {
        let client = MockClient::new()
            .with_latency(Duration::from_millis(10))
            .with_response("first", qa("q1"))
            .with_response("second", qa("q2"))
            .with_response("third", qa("q3"));
        let executor = executor(3);
        let pipeline = EnrichmentPipeline::new(&client, &executor);

        let items = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let outcome = pipeline
            .enrich::<_, QuestionAnswer, _>(items, "m", "sys", |s| s.clone())
            .await;

        let records = outcome.into_all().unwrap();
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.source_index, i);
            assert_eq!(record.response.question, format!("q{}", i + 1));
        }
        assert_eq!(records[1].source, "second");
    }

    #[tokio::test]
    async fn test_failed_item_is_not_an_empty_result() {
        let client = MockClient::new()
            .with_response("good", qa("fine"))
            .with_response("bad", json!({ "question": "missing fields" }));
        let executor = executor(2);
        let pipeline = EnrichmentPipeline::new(&client, &executor);

        let outcome = pipeline
            .enrich::<_, QuestionAnswer, _>(
                vec!["good".to_string(), "bad".to_string()],
                "m",
                "sys",
                |s| s.clone(),
            )
            .await;

        assert_eq!(outcome.failed_indices(), vec![1]);
        match &outcome.results()[1] {
            Err(LabError::RetriesExhausted { attempts, last }) => {
                assert_eq!(*attempts, 3);
                assert!(matches!(last, CallError::SchemaValidation(_)));
            }
            other => panic!("expected exhausted retries, got {:?}", other),
        }
        assert_eq!(client.calls_matching("bad"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_pipeline_admits_nothing() {
        let client = MockClient::new().with_response("x", qa("q"));
        let executor = executor(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pipeline = EnrichmentPipeline::new(&client, &executor).with_cancellation(cancel);

        let outcome = pipeline
            .enrich::<_, QuestionAnswer, _>(vec!["x".to_string()], "m", "sys", |s| s.clone())
            .await;

        assert!(outcome.results()[0].as_ref().is_err_and(LabError::is_cancelled));
        assert!(client.calls().is_empty());
    }
}
