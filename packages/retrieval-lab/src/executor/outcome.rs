//! Per-item results of a batch run.

use crate::error::{BatchFailure, ItemFailure, LabError, Result};

/// Results of a batch, one per input item, in input order.
///
/// A failed item stays an `Err` at its position; it is never coerced into
/// an empty success.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    results: Vec<Result<T>>,
}

impl<T> BatchOutcome<T> {
    pub fn new(results: Vec<Result<T>>) -> Self {
        Self { results }
    }

    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[Result<T>] {
        &self.results
    }

    pub fn into_results(self) -> Vec<Result<T>> {
        self.results
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.is_err().then_some(i))
            .collect()
    }

    /// True when every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }

    /// Fail-fast view: every value in input order, or the batch failure.
    pub fn into_all(self) -> std::result::Result<Vec<T>, BatchFailure> {
        let total = self.results.len();
        let (values, failures) = self.into_partial();
        if failures.is_empty() {
            return Ok(values.into_iter().map(|(_, v)| v).collect());
        }
        Err(BatchFailure {
            total,
            succeeded: values.len(),
            failures,
        })
    }

    /// [`into_all`](Self::into_all) with the failure lifted into `LabError`.
    pub fn into_result(self) -> Result<Vec<T>> {
        self.into_all().map_err(LabError::from)
    }

    /// Best-effort view: successes tagged with their input index, plus failures.
    pub fn into_partial(self) -> (Vec<(usize, T)>, Vec<ItemFailure>) {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for (index, result) in self.results.into_iter().enumerate() {
            match result {
                Ok(value) => values.push((index, value)),
                Err(error) => failures.push(ItemFailure { index, error }),
            }
        }
        (values, failures)
    }

    /// Apply `f` to each success, keeping failures in place.
    pub fn map<U>(self, mut f: impl FnMut(usize, T) -> U) -> BatchOutcome<U> {
        BatchOutcome {
            results: self
                .results
                .into_iter()
                .enumerate()
                .map(|(i, r)| r.map(|v| f(i, v)))
                .collect(),
        }
    }
}
