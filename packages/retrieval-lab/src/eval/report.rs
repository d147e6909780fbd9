//! Per-strategy aggregation and the evaluation report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::eval::metrics::{MetricKey, MetricReport};

/// Scores for one strategy over a query set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: String,

    /// Number of scored queries
    pub queries: usize,

    /// Mean of each metric across `per_query`
    pub mean: MetricReport,

    /// One report per scored query, in query order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_query: Vec<MetricReport>,
}

impl StrategyReport {
    pub fn new(strategy: impl Into<String>, per_query: Vec<MetricReport>) -> Self {
        Self {
            strategy: strategy.into(),
            queries: per_query.len(),
            mean: MetricReport::mean(&per_query),
            per_query,
        }
    }

    /// Drop per-query detail, keeping the means.
    pub fn summary(mut self) -> Self {
        self.per_query.clear();
        self
    }
}

/// The result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// Results requested from each strategy
    pub top_k: usize,
    pub cutoffs: Vec<usize>,
    pub strategies: Vec<StrategyReport>,
}

impl EvaluationReport {
    pub fn new(top_k: usize, cutoffs: Vec<usize>, strategies: Vec<StrategyReport>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            top_k,
            cutoffs,
            strategies,
        }
    }

    pub fn strategy(&self, name: &str) -> Option<&StrategyReport> {
        self.strategies.iter().find(|s| s.strategy == name)
    }

    /// Plain-text table of mean scores: one row per metric key, one column
    /// per strategy. Rows sort by metric then cutoff.
    pub fn render_table(&self) -> String {
        let keys: BTreeSet<MetricKey> = self
            .strategies
            .iter()
            .flat_map(|s| s.mean.keys().copied())
            .collect();

        let key_width = keys
            .iter()
            .map(|k| k.to_string().len())
            .chain(std::iter::once("metric".len()))
            .max()
            .unwrap_or_default();
        let widths: Vec<usize> = self
            .strategies
            .iter()
            .map(|s| s.strategy.len().max(5))
            .collect();

        let mut out = String::new();
        out.push_str(&format!("{:<key_width$}", "metric"));
        for (strategy, width) in self.strategies.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", strategy.strategy, width = width));
        }
        out.push('\n');

        for key in &keys {
            out.push_str(&format!("{:<key_width$}", key.to_string()));
            for (strategy, width) in self.strategies.iter().zip(&widths) {
                let cell = strategy
                    .mean
                    .get(key.metric, key.k)
                    .map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));
                out.push_str(&format!("  {:>width$}", cell, width = width));
            }
            out.push('\n');
        }
        out
    }
}
