//! Score retrieval strategies against labelled queries.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use retrieval_lab::ai::{CohereReranker, OpenAI};
use retrieval_lab::labels::{load_labels, read_jsonl};
use retrieval_lab::{
    Cutoffs, Document, EnrichmentPipeline, EvalConfig, Evaluation, MemoryStore, Retriever,
    SearchConfig, Strategy, DEFAULT_CUTOFFS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{cancel_on_ctrl_c, ExecutorArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// BM25 full-text search
    Fts,
    /// Cosine similarity over embeddings
    Vector,
    /// Reciprocal rank fusion of fts and vector
    Hybrid,
    /// Weighted sum of normalised vector and lexical scores
    LinearCombination,
    /// Hybrid candidates reordered by a cross-encoder
    Rerank,
    /// Full-text search restricted to the query's predicted category
    CategoryFiltered,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Passages as JSONL documents
    #[arg(long)]
    pub corpus: PathBuf,

    /// Labelled queries as JSONL
    #[arg(long)]
    pub labels: PathBuf,

    /// Strategies to compare
    #[arg(
        long = "strategy",
        value_enum,
        value_delimiter = ',',
        default_values_t = [StrategyArg::Fts, StrategyArg::Vector, StrategyArg::Hybrid]
    )]
    pub strategies: Vec<StrategyArg>,

    /// Results requested from each strategy
    #[arg(long, default_value_t = 25)]
    pub top_k: usize,

    /// Cutoffs to score at
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_CUTOFFS)]
    pub cutoffs: Vec<usize>,

    /// Vector weight for the linear-combination strategy
    #[arg(long, default_value_t = 0.7)]
    pub weight: f32,

    /// Cohere model for the rerank strategy
    #[arg(long, default_value = "rerank-english-v3.0")]
    pub rerank_model: String,

    /// OpenAI embedding model
    #[arg(long, default_value = "text-embedding-3-small", env = "LAB_EMBEDDING_MODEL")]
    pub embedding_model: String,

    /// Table the corpus is loaded into
    #[arg(long, default_value = "passages")]
    pub table: String,

    /// Texts embedded per request
    #[arg(long, default_value_t = 20)]
    pub embedding_batch_size: usize,

    /// Write the full report as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

impl EvaluateArgs {
    fn search_config(&self) -> SearchConfig {
        SearchConfig::new(&self.table)
            .with_top_k(self.top_k)
            .with_embedding_batch_size(self.embedding_batch_size)
    }

    fn strategies(&self) -> Result<Vec<Strategy>> {
        self.strategies
            .iter()
            .map(|arg| -> Result<Strategy> {
                Ok(match arg {
                    StrategyArg::Fts => Strategy::FullText,
                    StrategyArg::Vector => Strategy::Semantic,
                    StrategyArg::Hybrid => Strategy::Hybrid,
                    StrategyArg::LinearCombination => Strategy::linear_combination(self.weight)?,
                    StrategyArg::Rerank => {
                        let reranker = CohereReranker::from_env(&self.rerank_model)?;
                        Strategy::rerank(Arc::new(reranker))
                    }
                    StrategyArg::CategoryFiltered => Strategy::CategoryFiltered,
                })
            })
            .collect()
    }
}

pub async fn run(args: EvaluateArgs) -> Result<()> {
    let strategies = args.strategies()?;
    let cutoffs = Cutoffs::new(args.cutoffs.iter().copied())?;
    let config = EvalConfig::default()
        .with_cutoffs(cutoffs)
        .with_search(args.search_config());
    let evaluation = Evaluation::new(config)?.with_strategies(strategies);

    let client = OpenAI::from_env()?.with_embedding_model(&args.embedding_model);

    let documents: Vec<Document> = read_jsonl(&args.corpus)
        .with_context(|| format!("Failed to read corpus {}", args.corpus.display()))?;
    let queries = load_labels(&args.labels)
        .with_context(|| format!("Failed to read labels {}", args.labels.display()))?;
    info!(passages = documents.len(), queries = queries.len(), "Loaded inputs");

    let store = MemoryStore::new();
    store
        .ingest(&args.table, documents, &client, args.embedding_batch_size)
        .await
        .context("Failed to embed corpus")?;

    let mut retriever = Retriever::new(&store, &client, args.search_config())?;
    if evaluation
        .strategies()
        .iter()
        .any(|s| matches!(s, Strategy::CategoryFiltered))
    {
        let executor = args.executor.executor()?;
        let pipeline = EnrichmentPipeline::new(&client, &executor)
            .with_models(args.executor.models())
            .with_cancellation(cancel_on_ctrl_c());
        let texts: Vec<String> = queries.iter().map(|q| q.query.clone()).collect();
        let classified = retriever
            .classify_queries(&pipeline, &texts)
            .await
            .context("Failed to classify queries")?;
        info!(classified, "Classified queries for the category filter");
    }

    let report = evaluation.run(&retriever, &queries).await?;
    println!("{}", report.render_table());

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), run_id = %report.run_id, "Wrote report");
    }

    Ok(())
}
