//! umai
//!
//! Scrapes keibabook and netkeiba race pages, merges them into one text
//! block per horse and streams the race prompt to a Dify workflow.

mod assemble;
mod cli;
mod config;
mod dify;
mod normalize;
mod pipeline;
mod race;
mod scoring;
mod scraper;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries prompts and predictions
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prompt { race } => cli::run_prompt(race).await,
        Commands::Predict { race } => cli::run_predict(race).await,
        Commands::Venues => cli::run_venues(),
    }
}
