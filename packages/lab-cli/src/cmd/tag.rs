//! Capability tagging for a labelled query set.

use anyhow::{Context, Result};
use clap::Args;
use retrieval_lab::ai::OpenAI;
use retrieval_lab::labels::{load_labels, write_jsonl};
use retrieval_lab::{EnrichmentPipeline, KeywordTopics};
use std::path::PathBuf;
use tracing::info;

use super::{cancel_on_ctrl_c, ExecutorArgs};

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Labelled queries as JSONL
    #[arg(long)]
    pub labels: PathBuf,

    /// Topic keyword lists as a JSON array of arrays; queries get the
    /// index of the best-matching list
    #[arg(long)]
    pub topics: Option<PathBuf>,

    /// Where to write tagged queries as JSONL
    #[arg(long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

fn load_topics(path: Option<&PathBuf>) -> Result<KeywordTopics> {
    let Some(path) = path else {
        return Ok(KeywordTopics::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read topics {}", path.display()))?;
    let topics: Vec<Vec<String>> = serde_json::from_str(&raw).context("Invalid topics file")?;
    Ok(KeywordTopics::new(topics))
}

pub async fn run(args: TagArgs) -> Result<()> {
    let topics = load_topics(args.topics.as_ref())?;
    let queries: Vec<String> = load_labels(&args.labels)
        .with_context(|| format!("Failed to read labels {}", args.labels.display()))?
        .into_iter()
        .map(|q| q.query)
        .collect();

    let client = OpenAI::from_env()?;
    let executor = args.executor.executor()?;
    let pipeline = EnrichmentPipeline::new(&client, &executor)
        .with_models(args.executor.models())
        .with_cancellation(cancel_on_ctrl_c());

    let outcome = pipeline.tag_queries(queries, &topics).await;
    let tagged = args.executor.collect(outcome)?;

    write_jsonl(&args.output, &tagged)?;
    info!(tagged = tagged.len(), path = %args.output.display(), "Wrote tagged queries");
    Ok(())
}
