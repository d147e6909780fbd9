//! Synthetic question and metadata generation for passages.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use retrieval_lab::ai::OpenAI;
use retrieval_lab::labels::{category_test_labels, read_jsonl, save_labels, write_jsonl};
use retrieval_lab::{Document, EnrichmentPipeline, MetadataRecord};
use std::path::PathBuf;
use tracing::info;

use super::{cancel_on_ctrl_c, ExecutorArgs};

#[derive(Subcommand)]
pub enum SynthesizeCommand {
    /// A hypothetical question and answer per passage
    Questions(SynthesizeArgs),

    /// Questions that find similar papers without naming the title; also
    /// writes category-labelled ground truth with --labels-output
    CategoryQuestions {
        #[command(flatten)]
        args: SynthesizeArgs,

        /// Where to write the derived labelled queries
        #[arg(long)]
        labels_output: Option<PathBuf>,
    },

    /// Keywords and hypothetical search phrases per passage
    Metadata(SynthesizeArgs),
}

#[derive(Args, Debug)]
pub struct SynthesizeArgs {
    /// Passages as JSONL documents
    #[arg(long)]
    pub corpus: PathBuf,

    /// Where to write generated records as JSONL
    #[arg(long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

fn read_corpus(args: &SynthesizeArgs) -> Result<Vec<Document>> {
    read_jsonl(&args.corpus)
        .with_context(|| format!("Failed to read corpus {}", args.corpus.display()))
}

pub async fn run(cmd: SynthesizeCommand) -> Result<()> {
    let client = OpenAI::from_env()?;

    match cmd {
        SynthesizeCommand::Questions(args) => {
            let executor = args.executor.executor()?;
            let pipeline = EnrichmentPipeline::new(&client, &executor)
                .with_models(args.executor.models())
                .with_cancellation(cancel_on_ctrl_c());

            let outcome = pipeline.generate_questions(read_corpus(&args)?).await;
            let records = args.executor.collect(outcome)?;
            write_jsonl(&args.output, &records)?;
            info!(written = records.len(), path = %args.output.display(), "Wrote questions");
        }
        SynthesizeCommand::CategoryQuestions {
            args,
            labels_output,
        } => {
            let executor = args.executor.executor()?;
            let pipeline = EnrichmentPipeline::new(&client, &executor)
                .with_models(args.executor.models())
                .with_cancellation(cancel_on_ctrl_c());

            let outcome = pipeline.generate_category_questions(read_corpus(&args)?).await;
            let records = args.executor.collect(outcome)?;
            write_jsonl(&args.output, &records)?;
            info!(written = records.len(), path = %args.output.display(), "Wrote category questions");

            if let Some(path) = labels_output {
                let labels = category_test_labels(&records);
                save_labels(&path, &labels)?;
                info!(written = labels.len(), path = %path.display(), "Wrote category labels");
            }
        }
        SynthesizeCommand::Metadata(args) => {
            let executor = args.executor.executor()?;
            let pipeline = EnrichmentPipeline::new(&client, &executor)
                .with_models(args.executor.models())
                .with_cancellation(cancel_on_ctrl_c());

            let outcome = pipeline.generate_metadata(read_corpus(&args)?).await;
            let records: Vec<MetadataRecord> = args
                .executor
                .collect(outcome)?
                .iter()
                .map(MetadataRecord::from)
                .collect();
            write_jsonl(&args.output, &records)?;
            info!(written = records.len(), path = %args.output.display(), "Wrote metadata");
        }
    }

    Ok(())
}
