//! Scoring engine.
//!
//! - [`metrics`] scores one ranked list at several cutoffs
//! - [`report`] aggregates per strategy and renders the comparison table
//! - [`run`] drives strategies over a labelled query set

pub mod metrics;
pub mod report;
pub mod run;

pub use metrics::{score, Metric, MetricKey, MetricReport};
pub use report::{EvaluationReport, StrategyReport};
pub use run::Evaluation;
