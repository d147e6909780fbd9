//! Throttled retry executor over a batch of work items.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CallResult, ConfigError, LabError, Result};
use crate::executor::{AdmissionGate, BatchOutcome, Retry};
use crate::types::config::{ExecutorConfig, FailurePolicy};

/// Runs a unit of work for every item of a batch.
///
/// - At most `max_concurrency` attempts are admitted at once, retries included.
/// - A failing attempt is retried per the [`RetryBudget`](crate::RetryBudget),
///   sleeping without a permit.
/// - One item's exhausted retries never cancel its siblings, unless the
///   failure policy is [`FailurePolicy::FailFast`], in which case no new
///   attempts are admitted after the first terminal failure.
/// - Results come back in input order whatever the completion order.
#[derive(Debug, Clone)]
pub struct ThrottledExecutor {
    gate: AdmissionGate,
    retry: Retry,
    failure_policy: FailurePolicy,
}

impl ThrottledExecutor {
    pub fn new(config: &ExecutorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            gate: AdmissionGate::new(config.max_concurrency)?.with_in_flight(config.in_flight),
            retry: Retry::new(config.retry.clone())?,
            failure_policy: config.failure_policy,
        })
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Run `work` over `items` to completion.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, work: F) -> BatchOutcome<T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = CallResult<T>>,
    {
        self.run_until(items, work, &CancellationToken::new()).await
    }

    /// Run `work` over `items`, stopping admissions when `cancel` fires.
    ///
    /// Items that never got to finish report `LabError::Cancelled`.
    pub async fn run_until<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        work: F,
        cancel: &CancellationToken,
    ) -> BatchOutcome<T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = CallResult<T>>,
    {
        if items.is_empty() {
            return BatchOutcome::empty();
        }

        let total = items.len();
        let started = Instant::now();
        let batch_cancel = cancel.child_token();
        debug!(total, max_concurrency = self.gate.capacity(), "Starting batch");

        let mut pending: FuturesUnordered<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.run_item(index, item, &work, &batch_cancel))
            .collect();

        let mut slots: Vec<Option<Result<T>>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some((index, result)) = pending.next().await {
            if let Err(error) = &result {
                warn!(index, error = %error, "Item failed");
                if self.failure_policy == FailurePolicy::FailFast
                    && !error.is_cancelled()
                    && !batch_cancel.is_cancelled()
                {
                    warn!(index, "Fail-fast: no further attempts will be admitted");
                    batch_cancel.cancel();
                }
            }
            slots[index] = Some(result);
        }

        let outcome = BatchOutcome::new(
            slots
                .into_iter()
                .map(|slot| slot.unwrap_or(Err(LabError::Cancelled)))
                .collect(),
        );
        info!(
            total,
            succeeded = outcome.succeeded(),
            failed = total - outcome.succeeded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch complete"
        );
        outcome
    }

    async fn run_item<I, T, F, Fut>(
        &self,
        index: usize,
        item: I,
        work: &F,
        cancel: &CancellationToken,
    ) -> (usize, Result<T>)
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = CallResult<T>>,
    {
        let result = self
            .retry
            .run(cancel, |attempt| {
                let item = item.clone();
                async move {
                    debug!(index, attempt, "Waiting for admission");
                    self.gate
                        .admit(cancel, || work(item))
                        .await?
                        .map_err(LabError::from)
                }
            })
            .await;
        (index, result)
    }
}
