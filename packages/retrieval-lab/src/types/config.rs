//! Configuration types for execution, search and evaluation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Default cutoff sizes used when scoring ranked results.
pub const DEFAULT_CUTOFFS: [usize; 5] = [3, 5, 10, 15, 25];

/// Retry budget for a single unit of work.
///
/// Delay before retry `i` (zero-based) is drawn uniformly from
/// `[min_delay, ceiling(i)]`, where
/// `ceiling(i) = clamp(base_delay * 2^i, min_delay, max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    /// Total attempts including the first one. Default: 3.
    pub max_attempts: u32,

    /// Exponential base. Default: 1s.
    pub base_delay_ms: u64,

    /// Lower bound of the jitter window. Default: 10s.
    pub min_delay_ms: u64,

    /// Upper bound of any single delay. Default: 90s.
    pub max_delay_ms: u64,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            min_delay_ms: 10_000,
            max_delay_ms: 90_000,
        }
    }
}

impl RetryBudget {
    /// Create a budget with default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A budget that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Set the jitter window.
    pub fn with_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay_ms = min.as_millis() as u64;
        self.max_delay_ms = max.as_millis() as u64;
        self
    }

    /// Set the exponential base.
    pub fn with_base_delay(mut self, base: Duration) -> Self {
        self.base_delay_ms = base.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts);
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidBackoff {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }

    /// Upper bound of the delay before retry `retry` (zero-based).
    pub fn ceiling(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let exp = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(exp.min(self.max_delay_ms).max(self.min_delay_ms))
    }

    /// Jittered delay before retry `retry` (zero-based).
    pub fn delay<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let high = self.ceiling(retry).as_millis() as u64;
        if high <= self.min_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_delay_ms..=high))
    }
}

/// What happens to an admitted call when the run is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Let admitted calls finish; only new admissions stop.
    #[default]
    Drain,

    /// Drop admitted calls as soon as cancellation is observed.
    Abort,
}

/// How a batch reacts to an item that exhausted its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop admitting further attempts after the first terminal failure.
    FailFast,

    /// Keep going and collect every success alongside marked failures.
    #[default]
    BestEffort,
}

/// Configuration for the throttled retry executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum concurrently admitted attempts. Default: 10.
    pub max_concurrency: usize,

    #[serde(default)]
    pub retry: RetryBudget,

    #[serde(default)]
    pub in_flight: InFlightPolicy,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            retry: RetryBudget::default(),
            in_flight: InFlightPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..Default::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryBudget) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_in_flight(mut self, policy: InFlightPolicy) -> Self {
        self.in_flight = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrency));
        }
        self.retry.validate()
    }
}

/// Configuration for running retrieval strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Table holding the passages.
    pub table: String,

    /// Results requested per query.
    pub top_k: usize,

    /// Queries embedded per embedding call. Default: 20.
    pub embedding_batch_size: usize,

    /// Queries searched concurrently. Default: 8.
    pub search_concurrency: usize,

    /// Field matched by the category prefilter. Default: "category".
    pub category_field: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            table: "passages".to_string(),
            top_k: 25,
            embedding_batch_size: 20,
            search_concurrency: 8,
            category_field: "category".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_embedding_batch_size(mut self, size: usize) -> Self {
        self.embedding_batch_size = size;
        self
    }

    pub fn with_search_concurrency(mut self, concurrency: usize) -> Self {
        self.search_concurrency = concurrency;
        self
    }

    pub fn with_category_field(mut self, field: impl Into<String>) -> Self {
        self.category_field = field.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        if self.search_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }
        Ok(())
    }
}

/// Validated, sorted and de-duplicated cutoff sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Cutoffs(Vec<usize>);

impl Cutoffs {
    pub fn new(sizes: impl IntoIterator<Item = usize>) -> Result<Self, ConfigError> {
        let mut sizes: Vec<usize> = sizes.into_iter().collect();
        if sizes.is_empty() {
            return Err(ConfigError::EmptyCutoffs);
        }
        if sizes.contains(&0) {
            return Err(ConfigError::ZeroCutoff);
        }
        sizes.sort_unstable();
        sizes.dedup();
        Ok(Self(sizes))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Largest cutoff; strategies need at least this many results.
    pub fn max(&self) -> usize {
        self.0.last().copied().unwrap_or_default()
    }
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self(DEFAULT_CUTOFFS.to_vec())
    }
}

impl TryFrom<Vec<usize>> for Cutoffs {
    type Error = ConfigError;

    fn try_from(sizes: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(sizes)
    }
}

impl From<Cutoffs> for Vec<usize> {
    fn from(cutoffs: Cutoffs) -> Self {
        cutoffs.0
    }
}

/// Models used by the enrichment transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Capability tagging and category classification.
    pub tagging: String,

    /// Synthetic question/answer generation.
    pub synthesis: String,

    /// Keyword and phrase metadata.
    pub metadata: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tagging: "gpt-3.5-turbo".to_string(),
            synthesis: "gpt-4o".to_string(),
            metadata: "gpt-3.5-turbo".to_string(),
        }
    }
}

impl ModelConfig {
    /// Use one model for every transform.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            tagging: model.clone(),
            synthesis: model.clone(),
            metadata: model,
        }
    }
}

/// Configuration for an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default)]
    pub cutoffs: Cutoffs,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            cutoffs: Cutoffs::default(),
            search: SearchConfig::default(),
        }
    }
}

impl EvalConfig {
    pub fn with_cutoffs(mut self, cutoffs: Cutoffs) -> Self {
        self.cutoffs = cutoffs;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Results each strategy must return so every cutoff can be scored.
    pub fn top_k(&self) -> usize {
        self.search.top_k.max(self.cutoffs.max())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search.validate()
    }
}
