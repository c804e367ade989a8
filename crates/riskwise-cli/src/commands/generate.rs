//! Synthetic sample generation command implementation

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context, Result};
use riskwise_core::generator::write_csv;
use riskwise_core::{EngineConfig, GenerationStats, SampleGenerator};

/// Generate labeled samples, optionally writing them to CSV
pub fn cmd_generate(
    config: &EngineConfig,
    count: usize,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }

    let mut generator = match config.training.seed {
        Some(seed) => SampleGenerator::new(&config.generator, seed),
        None => SampleGenerator::from_entropy(&config.generator),
    };

    if !json {
        println!("🎲 Generating {} samples...", count);
    }

    let mut stats = GenerationStats::default();
    let mut samples = Vec::new();
    for chunk in generator.chunks(count, config.training.generation_chunk) {
        let chunk = chunk.context("Failed to generate samples")?;
        stats.record(&chunk);
        if output.is_some() {
            samples.extend(chunk);
        }
    }

    if let Some(path) = output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        write_csv(&samples, BufWriter::new(file)).context("Failed to write CSV")?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  Samples:        {}", stats.count);
    println!(
        "  Labeled risky:  {} ({:.1}%)",
        stats.positives,
        stats.positive_rate * 100.0
    );
    println!("  Mean rule risk: {:.3}", stats.mean_composed_risk);
    if let Some(path) = output {
        println!();
        println!("✅ Wrote {} samples to: {}", stats.count, path.display());
    }

    Ok(())
}
