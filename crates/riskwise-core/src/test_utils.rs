//! Test utilities for riskwise-core
//!
//! Classifier doubles for exercising the training orchestrator's failure,
//! cancellation and concurrency paths without fitting a real network.

use std::time::Duration;

use crate::classifier::{
    ClassifierModel, Dataset, EpochReport, FitControl, FitOptions, FitReport,
};
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::models::FeatureVector;

/// Always predicts the same probability; fitting succeeds immediately
pub struct FixedClassifier(pub f64);

impl ClassifierModel for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fit(
        &mut self,
        _train: &Dataset,
        _validation: Option<&Dataset>,
        options: &FitOptions,
        on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
    ) -> Result<FitReport> {
        run_epochs(options, Duration::ZERO, on_epoch)
    }

    fn predict(&self, _features: &FeatureVector) -> f64 {
        self.0
    }
}

/// Sleeps per epoch so a test can act while a run is active
pub struct SlowClassifier {
    pub epoch_delay: Duration,
}

impl Default for SlowClassifier {
    fn default() -> Self {
        Self {
            epoch_delay: Duration::from_millis(20),
        }
    }
}

impl ClassifierModel for SlowClassifier {
    fn name(&self) -> &str {
        "slow"
    }

    fn fit(
        &mut self,
        _train: &Dataset,
        _validation: Option<&Dataset>,
        options: &FitOptions,
        on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
    ) -> Result<FitReport> {
        run_epochs(options, self.epoch_delay, on_epoch)
    }

    fn predict(&self, _features: &FeatureVector) -> f64 {
        0.9
    }
}

/// How a `FailingClassifier` fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Return `TrainingFailed`
    Error,
    /// Panic inside `fit`
    Panic,
}

pub struct FailingClassifier(pub Failure);

impl ClassifierModel for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn fit(
        &mut self,
        _train: &Dataset,
        _validation: Option<&Dataset>,
        _options: &FitOptions,
        _on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
    ) -> Result<FitReport> {
        match self.0 {
            Failure::Error => Err(Error::TrainingFailed("loss diverged".to_string())),
            Failure::Panic => panic!("fit exploded"),
        }
    }

    fn predict(&self, _features: &FeatureVector) -> f64 {
        0.0
    }
}

/// Factory-compatible constructor for [`SlowClassifier`]
pub fn slow_classifier(_config: &TrainingConfig, _seed: u64) -> Result<Box<dyn ClassifierModel>> {
    Ok(Box::new(SlowClassifier::default()))
}

fn run_epochs(
    options: &FitOptions,
    delay: Duration,
    on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
) -> Result<FitReport> {
    for epoch in 1..=options.epochs {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let report = EpochReport {
            epoch,
            epochs: options.epochs,
            loss: 0.5,
            validation_loss: None,
            validation_accuracy: None,
        };
        if on_epoch(&report) == FitControl::Stop {
            return Err(Error::TrainingCancelled);
        }
    }
    Ok(FitReport {
        epochs_run: options.epochs,
        final_loss: 0.5,
        validation_loss: None,
        validation_accuracy: None,
    })
}
