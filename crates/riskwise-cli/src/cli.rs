//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Riskwise - Score transactions for fraud risk
#[derive(Parser)]
#[command(name = "riskwise")]
#[command(about = "Transaction risk scoring engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine config file
    ///
    /// Defaults to ~/.local/share/riskwise/config/engine.toml when present,
    /// otherwise the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fixed random seed for encoding jitter, generation and weight init
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a transaction into risk features and show its rule-based risk
    Encode {
        #[command(flatten)]
        transaction: TransactionArgs,
    },

    /// Generate labeled synthetic samples
    Generate {
        /// Number of samples
        #[arg(short, long, default_value = "1000")]
        count: usize,

        /// Write samples to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a classifier on synthetic data and report metrics
    Train {
        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Train a classifier, then score a transaction with it
    Assess {
        #[command(flatten)]
        transaction: TransactionArgs,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Show the effective engine configuration
    Config,
}

/// Raw attributes of a single transaction
#[derive(Args, Debug, Clone)]
pub struct TransactionArgs {
    /// Transaction amount
    #[arg(long)]
    pub amount: f64,

    /// Income level: low, middle, upper
    #[arg(long)]
    pub income: String,

    /// Hour of day (0-23)
    #[arg(long)]
    pub hour: u8,

    /// City name (unknown cities count as non-metro)
    #[arg(long)]
    pub location: String,

    /// Merchant tag (repeatable or comma-separated, e.g. crypto,travel)
    #[arg(long = "merchant", value_delimiter = ',', required = true)]
    pub merchants: Vec<String>,

    /// Payment mode: upi, debit, credit, netbanking, wallet
    #[arg(long)]
    pub payment: String,
}

/// Overrides for the configured training run
#[derive(Args, Debug, Clone, Default)]
pub struct TrainingArgs {
    /// Number of synthetic samples to generate
    #[arg(long)]
    pub samples: Option<usize>,

    /// Training epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}
