//! Shared utilities for command implementations
//!
//! This module contains:
//! - `load_config` - Resolve the engine configuration for a run
//! - `attributes_from_args` - Convert transaction flags into raw attributes
//! - `training_request` - Apply training flag overrides to the configuration

use std::path::Path;

use anyhow::{bail, Context, Result};
use riskwise_core::{
    EngineConfig, FeatureEncoder, IncomeLevel, PaymentMode, RawTransactionAttributes,
    TrainingRequest,
};

use crate::cli::{TrainingArgs, TransactionArgs};

/// Load engine config from an explicit path or the default locations.
///
/// A `--seed` flag overrides any seed set in the file.
pub fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            EngineConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => EngineConfig::load().context("Failed to load engine config")?,
    };

    if seed.is_some() {
        config.training.seed = seed;
    }
    Ok(config)
}

/// Build validated raw attributes from command-line flags
pub fn attributes_from_args(args: &TransactionArgs) -> Result<RawTransactionAttributes> {
    let income: IncomeLevel = args.income.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown income level: {}. Valid levels: low, middle, upper",
            args.income
        )
    })?;
    let payment: PaymentMode = args.payment.parse().map_err(|_| {
        anyhow::anyhow!(
            "Unknown payment mode: {}. Valid modes: upi, debit, credit, netbanking, wallet",
            args.payment
        )
    })?;

    let mut merchants: Vec<String> = Vec::with_capacity(args.merchants.len());
    for tag in args.merchants.iter().map(|m| m.trim().to_lowercase()) {
        if !merchants.contains(&tag) {
            merchants.push(tag);
        }
    }

    let attrs = RawTransactionAttributes::new(
        args.amount,
        income,
        args.hour,
        args.location.trim(),
        merchants,
        payment,
    );
    attrs.validate()?;
    Ok(attrs)
}

/// Training request from config, with flag overrides applied
pub fn training_request(config: &EngineConfig, args: &TrainingArgs) -> TrainingRequest {
    let mut request = TrainingRequest::from_config(&config.training);
    if let Some(samples) = args.samples {
        request.sample_count = samples;
    }
    if let Some(epochs) = args.epochs {
        request.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        request.batch_size = batch_size;
    }
    request
}

/// Encoder seeded from config when a seed is set
pub fn encoder_for(config: &EngineConfig) -> FeatureEncoder {
    match config.training.seed {
        Some(seed) => FeatureEncoder::seeded(seed),
        None => FeatureEncoder::from_entropy(),
    }
}
