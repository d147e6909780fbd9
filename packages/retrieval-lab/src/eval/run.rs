//! Evaluation runs: every strategy over every labelled query.

use std::time::Instant;
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::eval::metrics::score;
use crate::eval::report::{EvaluationReport, StrategyReport};
use crate::retrieval::{Retriever, Strategy};
use crate::traits::ai::Embedder;
use crate::traits::store::VectorStore;
use crate::types::config::EvalConfig;
use crate::types::query::LabeledQuery;

/// Compares named strategies head to head on one query set.
#[derive(Debug, Clone)]
pub struct Evaluation {
    config: EvalConfig,
    strategies: Vec<Strategy>,
}

impl Evaluation {
    pub fn new(config: EvalConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            strategies: Vec::new(),
        })
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        self.strategies.extend(strategies);
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run every strategy and score it against the labelled queries.
    ///
    /// Queries without ground truth are skipped. Any strategy error aborts
    /// the run.
    pub async fn run<S, E>(
        &self,
        retriever: &Retriever<'_, S, E>,
        queries: &[LabeledQuery],
    ) -> Result<EvaluationReport>
    where
        S: VectorStore + ?Sized,
        E: Embedder + ?Sized,
    {
        let labelled: Vec<&LabeledQuery> = queries
            .iter()
            .filter(|q| q.ground_truth.is_some())
            .collect();
        let skipped = queries.len() - labelled.len();
        if skipped > 0 {
            warn!(skipped, "Skipping queries without ground truth");
        }

        let texts: Vec<String> = labelled.iter().map(|q| q.query.clone()).collect();
        let top_k = self.config.top_k();
        let cutoffs = &self.config.cutoffs;

        let mut reports = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let started = Instant::now();
            let rankings = retriever.search(strategy, &texts, top_k).await?;

            let per_query = labelled
                .iter()
                .zip(&rankings)
                .map(|(query, ranking)| {
                    let truth = query
                        .ground_truth
                        .as_ref()
                        .map(|t| t.ids())
                        .unwrap_or_default();
                    score(ranking.ids(), truth, cutoffs)
                })
                .collect();

            let report = StrategyReport::new(strategy.name(), per_query);
            info!(
                strategy = %report.strategy,
                queries = report.queries,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Scored strategy"
            );
            reports.push(report);
        }

        Ok(EvaluationReport::new(
            top_k,
            cutoffs.as_slice().to_vec(),
            reports,
        ))
    }
}
