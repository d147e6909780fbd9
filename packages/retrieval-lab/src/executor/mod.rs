//! Bounded-concurrency execution with retry.
//!
//! Two independent layers wrap the same unit of work:
//!
//! - [`AdmissionGate`] bounds how many attempts run at once. A permit is
//!   held for exactly one attempt.
//! - [`Retry`] re-runs a failed attempt with jittered exponential backoff.
//!   It sleeps without holding a permit.
//!
//! [`ThrottledExecutor`] composes them over a batch and reassembles results
//! in input order.

pub mod gate;
pub mod outcome;
pub mod retry;
pub mod throttled;

pub use gate::AdmissionGate;
pub use outcome::BatchOutcome;
pub use retry::Retry;
pub use throttled::ThrottledExecutor;
