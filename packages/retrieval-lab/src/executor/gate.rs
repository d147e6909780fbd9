//! Admission gate: a counting semaphore around single attempts.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, LabError, Result};
use crate::types::config::InFlightPolicy;

/// Bounds the number of attempts running at the same time.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: InFlightPolicy,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> std::result::Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidConcurrency(capacity));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: InFlightPolicy::default(),
        })
    }

    pub fn with_in_flight(mut self, policy: InFlightPolicy) -> Self {
        self.in_flight = policy;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit, then run one attempt while holding it.
    ///
    /// The attempt future is only created once admitted. Cancellation while
    /// waiting returns `Cancelled` without running anything; cancellation
    /// after admission follows the gate's [`InFlightPolicy`].
    pub async fn admit<F, Fut, T>(&self, cancel: &CancellationToken, attempt: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LabError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| LabError::Cancelled)?,
        };

        match self.in_flight {
            InFlightPolicy::Drain => Ok(attempt().await),
            InFlightPolicy::Abort => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LabError::Cancelled),
                output = attempt() => Ok(output),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            AdmissionGate::new(0).unwrap_err(),
            ConfigError::InvalidConcurrency(0)
        );
    }

    #[tokio::test]
    async fn test_permit_released_after_attempt() {
        let gate = AdmissionGate::new(2).unwrap();
        let cancel = CancellationToken::new();

        let out = gate.admit(&cancel, || async { 7 }).await.unwrap();
        assert_eq!(out, 7);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_admission_does_not_run() {
        let gate = AdmissionGate::new(1).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ran = AtomicUsize::new(0);

        let result = gate
            .admit(&cancel, || async {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(LabError::Cancelled)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_lets_admitted_call_finish() {
        let gate = AdmissionGate::new(1).unwrap();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = gate
            .admit(&cancel, || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "done"
            })
            .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_drops_admitted_call() {
        let gate = AdmissionGate::new(1)
            .unwrap()
            .with_in_flight(InFlightPolicy::Abort);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = gate
            .admit(&cancel, || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "done"
            })
            .await;

        assert!(matches!(result, Err(LabError::Cancelled)));
        assert_eq!(gate.available(), 1);
    }
}
