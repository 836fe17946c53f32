//! Sequence-to-scalar regressors
//!
//! Every model implements [`ForecastModel`]: fit on a [`WindowSet`], then
//! predict one normalised target value per `lookback x features` window.
//! - [`LstmRegressor`] - recurrent encoder, dense ReLU projection, linear output
//! - [`RidgeRegressor`] - L2-regularised least squares on flattened windows

mod linalg;
mod lstm;
mod optimizer;
mod ridge;

pub use lstm::{LstmConfig, LstmRegressor};
pub use ridge::{RidgeConfig, RidgeRegressor};

use crate::error::{LoadcastError, Result, Stage};
use crate::timeseries::WindowSet;
use ndarray::{Array1, ArrayView3};
use serde::{Deserialize, Serialize};

/// Trainable regressor over lookback windows.
///
/// `fit` is the only mutating operation; `predict` fails with a
/// `StateError` until the model has been fitted.
pub trait ForecastModel: Send + Sync {
    fn fit(&mut self, windows: &WindowSet) -> Result<TrainingSummary>;

    /// One prediction per window, in normalised target scale
    fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Model choice and hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    Lstm(LstmConfig),
    Ridge(RidgeConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Lstm(LstmConfig::default())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelConfig::Lstm(c) => c.validate(),
            ModelConfig::Ridge(c) => c.validate(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelConfig::Lstm(_) => "lstm",
            ModelConfig::Ridge(_) => "ridge",
        }
    }
}

/// Instantiate an unfitted model
pub fn build_model(config: &ModelConfig) -> Box<dyn ForecastModel> {
    match config {
        ModelConfig::Lstm(c) => Box::new(LstmRegressor::new(c.clone())),
        ModelConfig::Ridge(c) => Box::new(RidgeRegressor::new(c.clone())),
    }
}

/// Outcome of one `fit` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub model: String,
    pub samples: usize,
    pub epochs: usize,
    /// Mean squared error (normalised scale) per epoch
    pub loss_history: Vec<f64>,
    pub final_loss: f64,
    pub duration_secs: f64,
}

/// Shared input checks for `fit`
pub(crate) fn check_training_set(windows: &WindowSet) -> Result<()> {
    if windows.is_empty() {
        return Err(LoadcastError::input(Stage::ForecastModel, "no training windows"));
    }
    if windows.n_features() == 0 || windows.lookback() == 0 {
        return Err(LoadcastError::shape(
            Stage::ForecastModel,
            "non-empty lookback and feature axes",
            format!("{} x {}", windows.lookback(), windows.n_features()),
        ));
    }
    Ok(())
}

/// Feature-axis check for `predict`
pub(crate) fn check_features(inputs: &ArrayView3<'_, f64>, expected: usize) -> Result<()> {
    let (_, _, n_features) = inputs.dim();
    if n_features != expected {
        return Err(LoadcastError::shape(
            Stage::ForecastModel,
            format!("{} features", expected),
            format!("{} features", n_features),
        ));
    }
    Ok(())
}

pub(crate) fn mse(predictions: &Array1<f64>, targets: ndarray::ArrayView1<'_, f64>) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / predictions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_json_tag() {
        let json = serde_json::to_string(&ModelConfig::Ridge(RidgeConfig { alpha: 0.5 })).unwrap();
        assert!(json.contains("\"type\":\"ridge\""));

        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "ridge");
    }

    #[test]
    fn test_build_model_is_unfitted() {
        let model = build_model(&ModelConfig::default());
        assert_eq!(model.name(), "lstm");
        assert!(!model.is_fitted());
    }
}
