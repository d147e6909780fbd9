//! Testing utilities including mock collaborators.
//!
//! These let the pipelines, searches and executor be exercised without
//! making real model or network calls.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{CallError, CallResult, Result};
use crate::traits::ai::{Embedder, StructuredClient, StructuredRequest};
use crate::traits::store::{Reranker, SearchHit};

/// Tracks how many callers are inside a section at once.
#[derive(Debug, Default, Clone)]
pub struct ConcurrencyProbe {
    state: Arc<ProbeState>,
}

#[derive(Debug, Default)]
struct ProbeState {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the section; leaving happens when the guard drops.
    pub fn enter(&self) -> ProbeGuard {
        let now = self.state.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard {
            state: Arc::clone(&self.state),
        }
    }

    pub fn current(&self) -> usize {
        self.state.current.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous callers observed.
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

/// Leaves the probed section on drop.
#[derive(Debug)]
pub struct ProbeGuard {
    state: Arc<ProbeState>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.state.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Record of a call made to [`MockClient`].
#[derive(Debug, Clone)]
pub struct MockCall {
    pub model: String,
    pub shape_name: String,
    pub user_prompt: String,
}

/// A scripted structured-output client.
///
/// Responses are matched by a substring of the user prompt, falling back to
/// a per-shape default. Failures can be queued per prompt substring and are
/// consumed one per call before any response is returned.
#[derive(Default, Clone)]
pub struct MockClient {
    /// (prompt substring, response) in registration order
    responses: Arc<RwLock<Vec<(String, Value)>>>,

    /// Fallback responses by shape name
    shape_defaults: Arc<RwLock<HashMap<String, Value>>>,

    /// Queued failures by prompt substring
    failures: Arc<RwLock<Vec<(String, VecDeque<CallError>)>>>,

    latency: Duration,
    probe: ConcurrencyProbe,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `pattern` with `response`.
    pub fn with_response(self, pattern: impl Into<String>, response: impl Serialize) -> Self {
        let value = serde_json::to_value(response).unwrap_or(Value::Null);
        self.responses.write().unwrap().push((pattern.into(), value));
        self
    }

    /// Answer any otherwise unmatched request for `shape_name`.
    pub fn with_default(self, shape_name: impl Into<String>, response: impl Serialize) -> Self {
        let value = serde_json::to_value(response).unwrap_or(Value::Null);
        self.shape_defaults
            .write()
            .unwrap()
            .insert(shape_name.into(), value);
        self
    }

    /// Fail the next `times` calls whose prompt contains `pattern`.
    pub fn with_failures(self, pattern: impl Into<String>, times: usize, error: CallError) -> Self {
        let queue = std::iter::repeat(error).take(times).collect();
        self.failures.write().unwrap().push((pattern.into(), queue));
        self
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn probe(&self) -> &ConcurrencyProbe {
        &self.probe
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls whose prompt contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| call.user_prompt.contains(pattern))
            .count()
    }

    fn next_failure(&self, prompt: &str) -> Option<CallError> {
        let mut failures = self.failures.write().unwrap();
        failures
            .iter_mut()
            .find(|(pattern, queue)| prompt.contains(pattern.as_str()) && !queue.is_empty())
            .and_then(|(_, queue)| queue.pop_front())
    }

    fn scripted(&self, request: &StructuredRequest) -> Option<Value> {
        let responses = self.responses.read().unwrap();
        responses
            .iter()
            .find(|(pattern, _)| request.user_prompt.contains(pattern.as_str()))
            .map(|(_, value)| value.clone())
            .or_else(|| {
                self.shape_defaults
                    .read()
                    .unwrap()
                    .get(&request.shape_name)
                    .cloned()
            })
    }
}

#[async_trait]
impl StructuredClient for MockClient {
    async fn call(&self, request: StructuredRequest) -> CallResult<Value> {
        self.calls.write().unwrap().push(MockCall {
            model: request.model.clone(),
            shape_name: request.shape_name.clone(),
            user_prompt: request.user_prompt.clone(),
        });

        let _guard = self.probe.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(error) = self.next_failure(&request.user_prompt) {
            return Err(error);
        }

        self.scripted(&request).ok_or_else(|| {
            CallError::Api(format!("no scripted response for {}", request.shape_name))
        })
    }
}

/// A deterministic embedder.
///
/// Unregistered texts get a vector derived from their SHA-256 digest, so
/// identical texts always embed identically.
#[derive(Clone)]
pub struct MockEmbedder {
    dimension: usize,
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    batch_sizes: Arc<RwLock<Vec<usize>>>,
    failures: Arc<RwLock<VecDeque<CallError>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            embeddings: Default::default(),
            batch_sizes: Default::default(),
            failures: Default::default(),
        }
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Fail the next `times` batches.
    pub fn with_failures(self, times: usize, error: CallError) -> Self {
        self.failures
            .write()
            .unwrap()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    /// Sizes of every batch requested so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.read().unwrap().clone()
    }

    fn deterministic(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());
        (0..self.dimension)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> CallResult<Vec<Vec<f32>>> {
        self.batch_sizes.write().unwrap().push(texts.len());
        if let Some(error) = self.failures.write().unwrap().pop_front() {
            return Err(error);
        }

        let known = self.embeddings.read().unwrap();
        Ok(texts
            .iter()
            .map(|text| {
                known
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.deterministic(text))
            })
            .collect())
    }
}

/// A reranker that reverses its candidates, recording every query.
#[derive(Debug, Default, Clone)]
pub struct MockReranker {
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl Reranker for MockReranker {
    fn name(&self) -> String {
        "mock_reverse".to_string()
    }

    async fn rerank(&self, query: &str, mut candidates: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        self.queries.write().unwrap().push(query.to_string());
        candidates.reverse();
        let total = candidates.len() as f32;
        for (rank, hit) in candidates.iter_mut().enumerate() {
            hit.score = total - rank as f32;
        }
        Ok(candidates)
    }
}
