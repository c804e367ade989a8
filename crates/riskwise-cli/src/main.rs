//! Riskwise CLI - Transaction risk scoring
//!
//! Usage:
//!   riskwise encode --amount 45000 --income middle --hour 23 \
//!       --location other --merchant crypto --payment netbanking
//!   riskwise generate --count 5000 --output samples.csv
//!   riskwise train --epochs 20
//!   riskwise assess <transaction flags> [--samples N --epochs N]

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so `--json` output on stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.seed)?;

    match cli.command {
        Commands::Encode { transaction } => commands::cmd_encode(&config, &transaction, cli.json),
        Commands::Generate { count, output } => {
            commands::cmd_generate(&config, count, output.as_deref(), cli.json)
        }
        Commands::Train { training } => commands::cmd_train(&config, &training, cli.json).await,
        Commands::Assess {
            transaction,
            training,
        } => commands::cmd_assess(&config, &transaction, &training, cli.json).await,
        Commands::Config => commands::cmd_config(&config, cli.config.as_deref(), cli.json),
    }
}
