//! Training and assessment command implementations

use std::future::Future;

use anyhow::{Context, Result};
use riskwise_core::{
    EngineConfig, RiskAssessment, RiskEngine, RiskTier, TrainingPhase, TrainingProgress,
    TrainingRequest, TrainingSummary,
};
use tracing::warn;

use super::core::{attributes_from_args, training_request};
use super::format_percent;
use crate::cli::{TrainingArgs, TransactionArgs};

/// Prints progress lines; generation is reported in 25% steps
struct ProgressPrinter {
    quiet: bool,
    next_generation_mark: f64,
}

impl ProgressPrinter {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            next_generation_mark: 0.25,
        }
    }

    fn report(&mut self, progress: &TrainingProgress) {
        if self.quiet {
            return;
        }
        match progress.phase {
            TrainingPhase::Generating => {
                if progress.fraction_complete + 1e-9 >= self.next_generation_mark {
                    println!("   Generating samples... {:.0}%", progress.percent());
                    while self.next_generation_mark <= progress.fraction_complete + 1e-9 {
                        self.next_generation_mark += 0.25;
                    }
                }
            }
            TrainingPhase::Fitting => {
                let mut line = format!(
                    "   Epoch {:>3}/{}  loss {:.4}",
                    progress.epoch, progress.epochs, progress.current_loss
                );
                if let Some(loss) = progress.validation_loss {
                    line.push_str(&format!("  val_loss {:.4}", loss));
                }
                if progress.validation_accuracy.is_some() {
                    line.push_str(&format!(
                        "  val_acc {}",
                        format_percent(progress.validation_accuracy)
                    ));
                }
                println!("{}", line);
            }
        }
    }
}

/// Run training to completion, printing progress. Ctrl-C aborts the run.
async fn run_training(
    engine: &RiskEngine,
    request: TrainingRequest,
    json: bool,
) -> Result<TrainingSummary> {
    drive_training(engine, request, json, tokio::signal::ctrl_c()).await
}

/// Run training until it finishes, aborting it once `interrupt` resolves
pub(crate) async fn drive_training<I>(
    engine: &RiskEngine,
    request: TrainingRequest,
    json: bool,
    interrupt: I,
) -> Result<TrainingSummary>
where
    I: Future<Output = std::io::Result<()>>,
{
    if !json {
        println!(
            "🧠 Training on {} samples for {} epochs (batch size {})...",
            request.sample_count, request.epochs, request.batch_size
        );
    }

    let mut handle = engine
        .start_training(request)
        .context("Failed to start training")?;
    let mut printer = ProgressPrinter::new(json);

    // Listen for the whole run so a signal between events is not lost
    tokio::pin!(interrupt);
    if let Some(mut progress) = handle.progress() {
        let mut interrupted = false;
        loop {
            tokio::select! {
                event = progress.recv() => match event {
                    Some(event) => printer.report(&event),
                    None => break,
                },
                signal = &mut interrupt, if !interrupted => {
                    interrupted = true;
                    match signal {
                        Ok(()) => {
                            warn!("Interrupt received, aborting training");
                            handle.abort();
                        }
                        Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
                    }
                }
            }
        }
    }

    handle.wait().await.context("Training did not complete")
}

fn print_summary(summary: &TrainingSummary) {
    let duration = summary.completed_at - summary.started_at;
    println!();
    println!("✅ Training complete ({})", summary.model);
    println!(
        "   Samples:        {} ({:.1}% labeled risky)",
        summary.samples,
        summary.positive_rate * 100.0
    );
    println!("   Epochs:         {}", summary.epochs);
    println!("   Final loss:     {:.4}", summary.final_loss);
    if let Some(loss) = summary.validation_loss {
        println!(
            "   Validation:     loss {:.4}, accuracy {}",
            loss,
            format_percent(summary.validation_accuracy)
        );
    }
    println!(
        "   Duration:       {:.1}s",
        duration.num_milliseconds() as f64 / 1000.0
    );
}

/// Train a classifier on synthetic data
pub async fn cmd_train(config: &EngineConfig, args: &TrainingArgs, json: bool) -> Result<()> {
    let engine = RiskEngine::new(config.clone()).context("Failed to create engine")?;
    let summary = run_training(&engine, training_request(config, args), json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn tier_icon(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::High => "🔴",
        RiskTier::Medium => "🟡",
        RiskTier::Low => "🟢",
    }
}

fn print_assessment(assessment: &RiskAssessment) {
    println!();
    println!(
        "{} Risk score: {:.1}% ({} risk)",
        tier_icon(assessment.tier),
        assessment.percent(),
        assessment.tier
    );
    println!("   {}", assessment.tier.advice());
    if assessment.is_suspicious {
        println!("   ⚠️  Flagged as suspicious");
    }
    println!("   Confidence: {:.0}%", assessment.confidence * 100.0);
}

/// Train a classifier, then score one transaction with it.
///
/// Trained models are not persisted, so every assessment trains first.
pub async fn cmd_assess(
    config: &EngineConfig,
    transaction: &TransactionArgs,
    training: &TrainingArgs,
    json: bool,
) -> Result<()> {
    // Reject bad input before spending time on training
    let attrs = attributes_from_args(transaction)?;

    let engine = RiskEngine::new(config.clone()).context("Failed to create engine")?;
    let summary = run_training(&engine, training_request(config, training), json).await?;
    let assessment = engine
        .assess(&attrs)
        .context("Failed to assess transaction")?;

    if json {
        let output = serde_json::json!({
            "assessment": assessment,
            "advice": assessment.tier.advice(),
            "training": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&summary);
        print_assessment(&assessment);
    }
    Ok(())
}
