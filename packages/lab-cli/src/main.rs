//! Retrieval lab command line
//!
//! Enrich a labelled query set or passage corpus with model calls, and
//! compare retrieval strategies against ground truth.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Retrieval strategy evaluation and LLM enrichment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score retrieval strategies against labelled queries
    Evaluate(cmd::evaluate::EvaluateArgs),

    /// Tag queries with the capabilities needed to answer them
    Tag(cmd::tag::TagArgs),

    /// Assign a subject category to queries or passages
    Classify(cmd::classify::ClassifyArgs),

    /// Generate synthetic questions or search metadata for passages
    #[command(subcommand)]
    Synthesize(cmd::synthesize::SynthesizeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,retrieval_lab=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Evaluate(args) => cmd::evaluate::run(args).await,
        Commands::Tag(args) => cmd::tag::run(args).await,
        Commands::Classify(args) => cmd::classify::run(args).await,
        Commands::Synthesize(cmd) => cmd::synthesize::run(cmd).await,
    }
}
