//! Subcommands and the flags they share.

pub mod classify;
pub mod evaluate;
pub mod synthesize;
pub mod tag;

use anyhow::{Context, Result};
use clap::Args;
use retrieval_lab::{
    BatchOutcome, ExecutorConfig, FailurePolicy, ModelConfig, RetryBudget, ThrottledExecutor,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Flags controlling how model calls are throttled and retried.
#[derive(Args, Debug, Clone)]
pub struct ExecutorArgs {
    /// Maximum model calls in flight at once
    #[arg(long, default_value_t = 10, env = "LAB_CONCURRENCY")]
    pub concurrency: usize,

    /// Attempts per item, including the first
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Keep going past failed items and write whatever succeeded
    #[arg(long)]
    pub best_effort: bool,

    /// Use this model for every enrichment transform
    #[arg(long, env = "LAB_MODEL")]
    pub model: Option<String>,
}

impl ExecutorArgs {
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.best_effort {
            FailurePolicy::BestEffort
        } else {
            FailurePolicy::FailFast
        }
    }

    pub fn executor(&self) -> Result<ThrottledExecutor> {
        let config = ExecutorConfig::new(self.concurrency)
            .with_retry(RetryBudget::new(self.max_attempts))
            .with_failure_policy(self.failure_policy());
        ThrottledExecutor::new(&config).context("Invalid executor flags")
    }

    pub fn models(&self) -> ModelConfig {
        self.model
            .as_deref()
            .map(ModelConfig::uniform)
            .unwrap_or_default()
    }

    /// Unwrap a batch according to the failure policy.
    ///
    /// Best-effort logs each failed index and keeps the successes; fail-fast
    /// turns any failure into an error.
    pub fn collect<T>(&self, outcome: BatchOutcome<T>) -> Result<Vec<T>> {
        if !self.best_effort {
            return outcome.into_result().context("Batch failed");
        }

        let (values, failures) = outcome.into_partial();
        for failure in &failures {
            warn!(index = failure.index, error = %failure.error, "Item failed, skipping");
        }
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                succeeded = values.len(),
                "Batch finished with failures"
            );
        }
        Ok(values.into_iter().map(|(_, value)| value).collect())
    }
}

/// A token that fires on Ctrl-C, so a long batch stops admitting calls.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, letting in-flight calls finish");
            trigger.cancel();
        }
    });
    cancel
}
