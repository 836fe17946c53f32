//! Error types for the loadcast pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for loadcast operations
pub type Result<T> = std::result::Result<T, LoadcastError>;

/// Pipeline stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Loader,
    FeatureBuilder,
    Normalizer,
    WindowBuilder,
    ForecastModel,
    Reconstructor,
    AnomalyDetector,
    Forecaster,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loader => "loader",
            Stage::FeatureBuilder => "feature builder",
            Stage::Normalizer => "normalizer",
            Stage::WindowBuilder => "window builder",
            Stage::ForecastModel => "forecast model",
            Stage::Reconstructor => "reconstructor",
            Stage::AnomalyDetector => "anomaly detector",
            Stage::Forecaster => "forecaster",
        };
        f.write_str(name)
    }
}

/// Main error type for the pipeline.
///
/// `InputError`, `StateError` and `ShapeError` are fatal to the current run
/// and always name the stage that raised them.
#[derive(Error, Debug)]
pub enum LoadcastError {
    #[error("Input error in {stage}: {reason}")]
    InputError { stage: Stage, reason: String },

    #[error("State error: {stage} used before fit")]
    StateError { stage: Stage },

    #[error("Invalid shape in {stage}: expected {expected}, got {actual}")]
    ShapeError {
        stage: Stage,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LoadcastError {
    pub fn input(stage: Stage, reason: impl Into<String>) -> Self {
        LoadcastError::InputError {
            stage,
            reason: reason.into(),
        }
    }

    pub fn shape(stage: Stage, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        LoadcastError::ShapeError {
            stage,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Stage that raised the error, for the input/state/shape taxonomy
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LoadcastError::InputError { stage, .. }
            | LoadcastError::StateError { stage }
            | LoadcastError::ShapeError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<polars::error::PolarsError> for LoadcastError {
    fn from(err: polars::error::PolarsError) -> Self {
        LoadcastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for LoadcastError {
    fn from(err: serde_json::Error) -> Self {
        LoadcastError::SerializationError(err.to_string())
    }
}
