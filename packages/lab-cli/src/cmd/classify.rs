//! Category classification for queries or passages.

use anyhow::{Context, Result};
use clap::Args;
use retrieval_lab::ai::OpenAI;
use retrieval_lab::labels::{load_labels, read_jsonl, write_jsonl};
use retrieval_lab::{Document, EnrichmentPipeline};
use std::path::PathBuf;
use tracing::info;

use super::{cancel_on_ctrl_c, ExecutorArgs};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Classify the queries of a labelled query file
    #[arg(long, conflicts_with = "corpus", required_unless_present = "corpus")]
    pub labels: Option<PathBuf>,

    /// Classify the passages of a JSONL corpus
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Where to write classified records as JSONL
    #[arg(long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

pub async fn run(args: ClassifyArgs) -> Result<()> {
    let client = OpenAI::from_env()?;
    let executor = args.executor.executor()?;
    let pipeline = EnrichmentPipeline::new(&client, &executor)
        .with_models(args.executor.models())
        .with_cancellation(cancel_on_ctrl_c());

    let written = match (&args.labels, &args.corpus) {
        (Some(path), _) => {
            let queries: Vec<String> = load_labels(path)
                .with_context(|| format!("Failed to read labels {}", path.display()))?
                .into_iter()
                .map(|q| q.query)
                .collect();
            let records = args
                .executor
                .collect(pipeline.classify_queries(queries).await)?;
            write_jsonl(&args.output, &records)?;
            records.len()
        }
        (None, Some(path)) => {
            let documents: Vec<Document> = read_jsonl(path)
                .with_context(|| format!("Failed to read corpus {}", path.display()))?;
            let records = args
                .executor
                .collect(pipeline.classify_documents(documents).await)?;
            write_jsonl(&args.output, &records)?;
            records.len()
        }
        (None, None) => anyhow::bail!("Pass --labels or --corpus"),
    };

    info!(written, path = %args.output.display(), "Wrote classified records");
    Ok(())
}
