//! Trainable binary classifiers
//!
//! This module decouples the training orchestrator from any specific
//! learning implementation.
//!
//! # Architecture
//!
//! - `ClassifierModel` trait: fit over a [`Dataset`], predict one [`FeatureVector`]
//! - `MlpClassifier`: feed-forward network (ReLU hidden layers, dropout, sigmoid output)
//! - `Dataset`: dense feature/label matrices with shuffling, splitting and batching
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut model = MlpClassifier::new(FEATURE_COUNT, &[64, 32, 16], 0.2, 0.001, seed)?;
//! let report = model.fit(&train, Some(&validation), &options, &mut |epoch| {
//!     println!("epoch {} loss {:.4}", epoch.epoch, epoch.loss);
//!     FitControl::Continue
//! })?;
//! let probability = model.predict(&features);
//! ```

mod dataset;
mod mlp;

pub use dataset::Dataset;
pub use mlp::MlpClassifier;

use serde::Serialize;

use crate::error::Result;
use crate::models::FeatureVector;

/// Per-fit options
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
}

/// Metrics reported after each epoch
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EpochReport {
    /// 1-based epoch number
    pub epoch: usize,
    pub epochs: usize,
    /// Mean training loss over the epoch
    pub loss: f64,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

/// Whether fitting should continue after an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitControl {
    Continue,
    Stop,
}

/// Final metrics of a completed fit
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitReport {
    pub epochs_run: usize,
    pub final_loss: f64,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

/// Trait defining the interface for trainable risk classifiers
///
/// Implementations must be Send + Sync: a fitted model is shared read-only
/// between the engine and concurrent scoring calls.
pub trait ClassifierModel: Send + Sync {
    /// Short identifier of the implementation
    fn name(&self) -> &str;

    /// Fit on `train`, reporting after each epoch.
    ///
    /// Returns `TrainingCancelled` if `on_epoch` asks to stop, and
    /// `TrainingFailed` on numerical failure.
    fn fit(
        &mut self,
        train: &Dataset,
        validation: Option<&Dataset>,
        options: &FitOptions,
        on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
    ) -> Result<FitReport>;

    /// Probability in [0, 1] that the transaction is risky
    fn predict(&self, features: &FeatureVector) -> f64;
}
