//! Typed errors for the retrieval lab.
//!
//! Uses `thiserror` for library errors (not `anyhow`). The taxonomy splits
//! into transient call failures (retried), configuration errors (never
//! retried) and batch-level partial failures.

use thiserror::Error;

/// Failures surfaced by a structured-extraction or embedding call.
///
/// Every variant is treated as transient by the retry layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// Provider throttled the request (HTTP 429 or equivalent)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Model output did not decode into the requested shape
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// Connection, timeout or body-read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success response that is not a rate limit
    #[error("API error: {0}")]
    Api(String),
}

impl CallError {
    /// Whether the retry layer should try this call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::RateLimited(_)
            | CallError::SchemaValidation(_)
            | CallError::Transport(_)
            | CallError::Api(_) => true,
        }
    }
}

/// Invalid configuration. Fails immediately, never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("concurrency bound must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("max_attempts must be at least 1")]
    InvalidAttempts,

    #[error("invalid backoff window: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidBackoff { min_ms: u64, max_ms: u64 },

    #[error("cutoff list must not be empty")]
    EmptyCutoffs,

    #[error("cutoff sizes must be positive")]
    ZeroCutoff,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("reranker weight must be within [0, 1], got {0}")]
    InvalidWeight(f32),

    #[error("missing credential: {0}")]
    MissingCredential(String),
}

/// Errors that can occur across the harness.
#[derive(Debug, Error)]
pub enum LabError {
    /// A single call failed and was not retried further
    #[error(transparent)]
    Call(#[from] CallError),

    /// Configuration rejected before any work started
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Run was cancelled before this item finished
    #[error("operation cancelled")]
    Cancelled,

    /// Retry budget used up; `last` is the final attempt's error
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: CallError },

    /// Table is not present in the vector store
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// No category is known for a query routed through the category prefilter
    #[error("no category for query: {0}")]
    Unclassified(String),

    /// Vector store failure
    #[error("store error: {0}")]
    Store(String),

    /// Malformed line in a JSONL artifact
    #[error("line {line}: {source}")]
    Jsonl {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Some items of a batch exhausted their retries
    #[error(transparent)]
    PartialBatch(#[from] BatchFailure),
}

impl LabError {
    /// True when the error came from cancellation rather than a failed call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LabError::Cancelled)
    }
}

/// One failed item of a batch, keyed by its input position.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub error: LabError,
}

/// Batch-level failure: some items succeeded, others did not.
#[derive(Debug, Error)]
#[error("{} of {total} items failed", .failures.len())]
pub struct BatchFailure {
    /// Number of items submitted
    pub total: usize,

    /// Number of items that produced a result
    pub succeeded: usize,

    /// Failed items in input order
    pub failures: Vec<ItemFailure>,
}

impl BatchFailure {
    /// Input positions of the failed items.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, LabError>;

/// Result type alias for a single collaborator call.
pub type CallResult<T> = std::result::Result<T, CallError>;
