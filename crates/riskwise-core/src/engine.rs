//! Training orchestration and the scoring entry point
//!
//! `RiskEngine` owns the classifier lifecycle:
//! - at most one training run at a time (a second start is rejected)
//! - runs execute on a blocking worker so scoring keeps using the previous model
//! - progress is streamed over a channel, runs can be aborted between
//!   generation chunks and between epochs
//! - a new model replaces the old one only after a run succeeds

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classifier::{ClassifierModel, Dataset, FitControl, FitOptions, MlpClassifier};
use crate::config::{EngineConfig, TrainingConfig};
use crate::encoder::FeatureEncoder;
use crate::error::{Error, Result};
use crate::generator::SampleGenerator;
use crate::models::{
    EngineStatus, FeatureVector, RawTransactionAttributes, RiskAssessment, TrainingPhase,
    TrainingProgress, TrainingSummary,
};
use crate::scoring;

/// Builds a fresh, untrained classifier for a run
pub type ClassifierFactory =
    Arc<dyn Fn(&TrainingConfig, u64) -> Result<Box<dyn ClassifierModel>> + Send + Sync>;

fn default_classifier(config: &TrainingConfig, seed: u64) -> Result<Box<dyn ClassifierModel>> {
    Ok(Box::new(MlpClassifier::from_config(config, seed)?))
}

/// Parameters of one training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub sample_count: usize,
    pub epochs: usize,
    pub batch_size: usize,
}

impl TrainingRequest {
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            sample_count: config.sample_count,
            epochs: config.epochs,
            batch_size: config.batch_size,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sample_count == 0 || self.epochs == 0 || self.batch_size == 0 {
            return Err(Error::TrainingFailed(format!(
                "sample_count, epochs and batch_size must be positive \
                 (got {}, {}, {})",
                self.sample_count, self.epochs, self.batch_size
            )));
        }
        Ok(())
    }
}

impl Default for TrainingRequest {
    fn default() -> Self {
        Self::from_config(&TrainingConfig::default())
    }
}

#[derive(Default)]
struct EngineState {
    training: bool,
    model: Option<Arc<dyn ClassifierModel>>,
    last_summary: Option<TrainingSummary>,
}

struct EngineInner {
    config: EngineConfig,
    factory: ClassifierFactory,
    state: Mutex<EngineState>,
    encoder: Mutex<FeatureEncoder>,
}

impl EngineInner {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        // State is only ever written in short, non-panicking sections
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the training flag however the worker exits
struct TrainingGuard {
    inner: Arc<EngineInner>,
    armed: bool,
}

impl TrainingGuard {
    fn new(inner: Arc<EngineInner>) -> Self {
        Self { inner, armed: true }
    }

    /// Publish the trained model and leave the Training state under one lock
    fn complete(mut self, model: Arc<dyn ClassifierModel>, summary: &TrainingSummary) {
        let mut state = self.inner.state();
        state.model = Some(model);
        state.last_summary = Some(summary.clone());
        state.training = false;
        self.armed = false;
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state().training = false;
        }
    }
}

/// Handle to an active training run
pub struct TrainingHandle {
    progress: Option<mpsc::UnboundedReceiver<TrainingProgress>>,
    abort: Arc<AtomicBool>,
    join: JoinHandle<Result<TrainingSummary>>,
}

impl TrainingHandle {
    /// Progress event stream (can be taken once)
    pub fn progress(&mut self) -> Option<mpsc::UnboundedReceiver<TrainingProgress>> {
        self.progress.take()
    }

    /// Request cancellation; honoured between chunks and epochs
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to finish
    pub async fn wait(self) -> Result<TrainingSummary> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(Error::TrainingFailed(format!("training worker failed: {}", e))),
        }
    }
}

/// Transaction risk engine
#[derive(Clone)]
pub struct RiskEngine {
    inner: Arc<EngineInner>,
}

impl RiskEngine {
    /// Engine with the default network classifier
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_factory(config, Arc::new(default_classifier))
    }

    /// Engine with a custom classifier implementation
    pub fn with_factory(config: EngineConfig, factory: ClassifierFactory) -> Result<Self> {
        config.validate()?;
        let encoder = match config.training.seed {
            Some(seed) => FeatureEncoder::seeded(seed),
            None => FeatureEncoder::from_entropy(),
        };
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                factory,
                state: Mutex::new(EngineState::default()),
                encoder: Mutex::new(encoder),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Encode raw attributes into a feature vector
    pub fn encode(&self, attrs: &RawTransactionAttributes) -> Result<FeatureVector> {
        let mut encoder = self
            .inner
            .encoder
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        encoder.encode(attrs)
    }

    /// Score a feature vector with the current model
    pub fn score(&self, features: &FeatureVector) -> Result<RiskAssessment> {
        // Clone the model reference so prediction runs without the lock held
        let model = self.inner.state().model.clone();
        scoring::score(model.as_deref(), features, &self.inner.config.scoring)
    }

    /// Encode and score in one step
    pub fn assess(&self, attrs: &RawTransactionAttributes) -> Result<RiskAssessment> {
        let features = self.encode(attrs)?;
        self.score(&features)
    }

    pub fn is_training(&self) -> bool {
        self.inner.state().training
    }

    pub fn has_model(&self) -> bool {
        self.inner.state().model.is_some()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.inner.state();
        if state.training {
            EngineStatus::Training
        } else if state.model.is_some() {
            EngineStatus::Trained
        } else {
            EngineStatus::NeverTrained
        }
    }

    /// Summary of the last successful run
    pub fn last_summary(&self) -> Option<TrainingSummary> {
        self.inner.state().last_summary.clone()
    }

    /// Start a training run on a blocking worker.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// `AlreadyTraining` if a run is active, leaving that run untouched.
    pub fn start_training(&self, request: TrainingRequest) -> Result<TrainingHandle> {
        request.validate()?;

        {
            let mut state = self.inner.state();
            if state.training {
                warn!("Rejected training request: a run is already active");
                return Err(Error::AlreadyTraining);
            }
            state.training = true;
        }
        let guard = TrainingGuard::new(Arc::clone(&self.inner));

        let seed = self
            .inner
            .config
            .training
            .seed
            .unwrap_or_else(rand::random);
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();

        let inner = Arc::clone(&self.inner);
        let worker_abort = Arc::clone(&abort);
        let join = tokio::task::spawn_blocking(move || {
            let result = match run_training(&inner, request, seed, &worker_abort, &tx) {
                Ok((model, summary)) => {
                    guard.complete(model, &summary);
                    info!(
                        "Training finished: loss {:.4}, validation accuracy {}",
                        summary.final_loss,
                        summary
                            .validation_accuracy
                            .map_or_else(|| "n/a".to_string(), |a| format!("{:.1}%", a * 100.0))
                    );
                    Ok(summary)
                }
                Err(e) => {
                    drop(guard);
                    match &e {
                        Error::TrainingCancelled => warn!("Training aborted, keeping previous model"),
                        e => warn!("Training failed, keeping previous model: {}", e),
                    }
                    Err(e)
                }
            };
            // Progress ends only once the engine is Idle again
            drop(tx);
            result
        });

        Ok(TrainingHandle {
            progress: Some(rx),
            abort,
            join,
        })
    }

    /// Run training to completion, forwarding progress to a callback
    pub async fn train<F>(
        &self,
        request: TrainingRequest,
        mut on_progress: F,
    ) -> Result<TrainingSummary>
    where
        F: FnMut(&TrainingProgress),
    {
        let mut handle = self.start_training(request)?;
        if let Some(mut progress) = handle.progress() {
            while let Some(event) = progress.recv().await {
                on_progress(&event);
            }
        }
        handle.wait().await
    }
}

/// Body of a training run (executes on the blocking worker).
///
/// Returns the fitted model without publishing it.
fn run_training(
    inner: &EngineInner,
    request: TrainingRequest,
    seed: u64,
    abort: &AtomicBool,
    progress: &mpsc::UnboundedSender<TrainingProgress>,
) -> Result<(Arc<dyn ClassifierModel>, TrainingSummary)> {
    let config = &inner.config.training;
    let started_at = Utc::now();
    info!(
        "Training started: {} samples, {} epochs, batch size {}",
        request.sample_count, request.epochs, request.batch_size
    );

    let mut model = (inner.factory)(config, seed.wrapping_add(1))?;

    let mut generator = SampleGenerator::new(&inner.config.generator, seed);
    let mut samples = Vec::with_capacity(request.sample_count);
    for chunk in generator.chunks(request.sample_count, config.generation_chunk) {
        if abort.load(Ordering::SeqCst) {
            return Err(Error::TrainingCancelled);
        }
        samples.extend(chunk?);
        debug!("Generated {}/{} samples", samples.len(), request.sample_count);
        // A closed receiver only means nobody is watching
        let _ = progress.send(TrainingProgress {
            phase: TrainingPhase::Generating,
            fraction_complete: samples.len() as f64 / request.sample_count as f64,
            current_loss: 0.0,
            epoch: 0,
            epochs: request.epochs,
            validation_loss: None,
            validation_accuracy: None,
        });
    }
    if abort.load(Ordering::SeqCst) {
        return Err(Error::TrainingCancelled);
    }

    let mut data = Dataset::from_samples(&samples);
    drop(samples);
    let positive_rate = data.positive_rate();
    data.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(2)));
    let (train, validation) = data.split(config.validation_split);
    debug!(
        "Fitting {} on {} samples ({} held out), positive rate {:.3}",
        model.name(),
        train.len(),
        validation.as_ref().map_or(0, Dataset::len),
        positive_rate
    );

    let options = FitOptions {
        epochs: request.epochs,
        batch_size: request.batch_size,
    };
    let report = model.fit(&train, validation.as_ref(), &options, &mut |epoch| {
        let _ = progress.send(TrainingProgress {
            phase: TrainingPhase::Fitting,
            fraction_complete: epoch.epoch as f64 / epoch.epochs as f64,
            current_loss: epoch.loss,
            epoch: epoch.epoch,
            epochs: epoch.epochs,
            validation_loss: epoch.validation_loss,
            validation_accuracy: epoch.validation_accuracy,
        });
        if abort.load(Ordering::SeqCst) {
            FitControl::Stop
        } else {
            FitControl::Continue
        }
    })?;

    let summary = TrainingSummary {
        model: model.name().to_string(),
        samples: request.sample_count,
        positive_rate,
        epochs: report.epochs_run,
        final_loss: report.final_loss,
        validation_loss: report.validation_loss,
        validation_accuracy: report.validation_accuracy,
        started_at,
        completed_at: Utc::now(),
    };

    Ok((Arc::from(model), summary))
}
