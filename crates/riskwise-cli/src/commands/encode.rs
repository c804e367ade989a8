//! Feature encoding command implementation

use anyhow::{Context, Result};
use riskwise_core::risk::LABEL_THRESHOLD;
use riskwise_core::{compose, EngineConfig, FeatureBreakdown};

use super::core::{attributes_from_args, encoder_for};
use crate::cli::TransactionArgs;

/// Encode one transaction and explain its rule-based risk
pub fn cmd_encode(config: &EngineConfig, args: &TransactionArgs, json: bool) -> Result<()> {
    let attrs = attributes_from_args(args)?;
    let features = encoder_for(config)
        .encode(&attrs)
        .context("Failed to encode transaction")?;
    let breakdown = FeatureBreakdown::new(&attrs, &features);
    let composition = compose(&features);

    if json {
        let output = serde_json::json!({
            "attributes": attrs,
            "features": features.to_log_entry(),
            "breakdown": breakdown,
            "composition": composition,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("🔍 Feature vector");
    println!();
    println!(
        "  {:<16} {:>6} {:>7} {:>13}",
        "Feature", "Value", "Weight", "Contribution"
    );
    for c in &breakdown.contributions {
        println!(
            "  {:<16} {:>6.3} {:>7.2} {:>13.3}",
            c.name, c.value, c.weight, c.contribution
        );
    }
    println!();
    println!("  Time band:       {}", breakdown.time_band.label());
    println!(
        "  Spending ratio:  {:.1}% of monthly income",
        breakdown.spending_ratio * 100.0
    );
    if let Some(dominant) = breakdown.dominant() {
        println!("  Largest factor:  {}", dominant.name);
    }
    println!();

    println!(
        "⚖️  Rule-based risk: {:.3} (base {:.3} × multiplier {:.2})",
        composition.risk, composition.base, composition.multiplier
    );
    if !composition.triggered.is_empty() {
        println!("   Combinations: {}", composition.triggered.join(", "));
    }
    if composition.high_factors >= 2 {
        println!("   Elevated factors: {}", composition.high_factors);
    }
    if composition.risk > LABEL_THRESHOLD {
        println!("   ⚠️  Would be labeled risky in training data");
    } else {
        println!("   ✅ Would be labeled normal in training data");
    }

    Ok(())
}
