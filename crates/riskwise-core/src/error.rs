//! Error types for Riskwise

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid attributes: {0}")]
    InvalidAttributes(String),

    #[error("A training run is already in progress")]
    AlreadyTraining,

    #[error("Training failed: {0}")]
    TrainingFailed(String),

    #[error("Training cancelled")]
    TrainingCancelled,

    #[error("No trained model available; run training first")]
    ModelNotTrained,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
