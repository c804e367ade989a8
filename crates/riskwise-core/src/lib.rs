//! Riskwise Core Library
//!
//! Transaction risk scoring:
//! - Feature encoding of raw transaction attributes into six bounded risk features
//! - Rule-based risk composition used to label synthetic training data
//! - Synthetic sample generation from weighted population statistics
//! - Pluggable classifiers with a built-in feed-forward network
//! - Training orchestration with progress reporting and cancellation
//! - Scoring into Low / Medium / High risk tiers

pub mod classifier;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod generator;
pub mod models;
pub mod risk;
pub mod scoring;

/// Classifier doubles for orchestration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use classifier::{
    ClassifierModel, Dataset, EpochReport, FitControl, FitOptions, FitReport, MlpClassifier,
};
pub use config::{EngineConfig, GeneratorConfig, IncomePrior, ScoringConfig, TrainingConfig};
pub use encoder::{encode, FeatureBreakdown, FeatureContribution, FeatureEncoder, TimeBand};
pub use engine::{ClassifierFactory, RiskEngine, TrainingHandle, TrainingRequest};
pub use error::{Error, Result};
pub use generator::{GenerationStats, MerchantCategory, SampleGenerator};
pub use models::{
    EngineStatus, FeatureVector, IncomeLevel, LabeledSample, PaymentMode,
    RawTransactionAttributes, RiskAssessment, RiskTier, TrainingPhase, TrainingProgress,
    TrainingSummary, FEATURE_COUNT, FEATURE_NAMES,
};
pub use risk::{compose, compose_risk, RiskComposition};
