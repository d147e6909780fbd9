//! Retry decorator with jittered exponential backoff.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ConfigError, LabError, Result};
use crate::types::config::RetryBudget;

/// Re-runs a unit of work on transient failure.
///
/// Only `LabError::Call` errors whose [`is_retryable`](crate::CallError::is_retryable)
/// holds are retried; anything else (cancellation included) returns at once.
#[derive(Debug, Clone)]
pub struct Retry {
    budget: RetryBudget,
}

impl Retry {
    pub fn new(budget: RetryBudget) -> std::result::Result<Self, ConfigError> {
        budget.validate()?;
        Ok(Self { budget })
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Run `attempt` until it succeeds or the budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number. Backoff sleeps end
    /// early with `Cancelled` when `cancel` fires.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.budget.max_attempts;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match attempt(attempts).await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(attempts, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(LabError::Call(e)) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            if attempts >= max_attempts {
                return Err(LabError::RetriesExhausted {
                    attempts,
                    last: error,
                });
            }

            let delay = self.budget.delay(attempts - 1, &mut rand::thread_rng());
            warn!(
                attempt = attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LabError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let retry = Retry::new(RetryBudget::immediate(3)).unwrap();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result = retry
            .run(&CancellationToken::new(), |_| async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(CallError::RateLimited("slow down".into()).into())
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let retry = Retry::new(RetryBudget::immediate(2)).unwrap();

        let result: Result<()> = retry
            .run(&CancellationToken::new(), |n| async move {
                Err(CallError::Transport(format!("attempt {}", n)).into())
            })
            .await;

        match result {
            Err(LabError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last, CallError::Transport("attempt 2".into()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_call_errors_are_not_retried() {
        let retry = Retry::new(RetryBudget::immediate(5)).unwrap();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<()> = retry
            .run(&CancellationToken::new(), |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LabError::Store("boom".into()))
            })
            .await;

        assert!(matches!(result, Err(LabError::Store(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_inside_window() {
        let budget = RetryBudget::new(2)
            .with_base_delay(Duration::from_millis(100))
            .with_delays(Duration::from_millis(100), Duration::from_millis(100));
        let retry = Retry::new(budget).unwrap();
        let start = tokio::time::Instant::now();

        let _ = retry
            .run(&CancellationToken::new(), |n| async move {
                if n == 1 {
                    Err::<(), _>(CallError::Api("500".into()).into())
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let retry = Retry::new(RetryBudget::default()).unwrap();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let result: Result<()> = retry
            .run(&cancel, |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CallError::RateLimited("429".into()).into())
            })
            .await;

        assert!(matches!(result, Err(LabError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(matches!(
            Retry::new(RetryBudget::immediate(0)),
            Err(ConfigError::InvalidAttempts)
        ));
    }
}
