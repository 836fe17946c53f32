//! Residual thresholding

use crate::error::{LoadcastError, Result, Stage};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Consistency constant that makes MAD estimate the standard deviation of
/// normally distributed data
const MAD_SCALE: f64 = 1.4826;

/// How the anomaly threshold is derived from the residuals of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// `mean + k * std` (population std) over every residual, anomalies
    /// included. Large outliers inflate both statistics.
    MeanStd { k: f64 },
    /// `median + k * 1.4826 * MAD`
    MedianMad { k: f64 },
}

impl Default for ThresholdRule {
    fn default() -> Self {
        ThresholdRule::MeanStd { k: 3.0 }
    }
}

impl ThresholdRule {
    pub fn k(&self) -> f64 {
        match *self {
            ThresholdRule::MeanStd { k } | ThresholdRule::MedianMad { k } => k,
        }
    }

    fn threshold(&self, residuals: &[f64], mean: f64, std: f64) -> f64 {
        match *self {
            ThresholdRule::MeanStd { k } => mean + k * std,
            ThresholdRule::MedianMad { k } => {
                let med = median(residuals.to_vec());
                let mad = median(residuals.iter().map(|r| (r - med).abs()).collect());
                med + k * MAD_SCALE * mad
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub rule: ThresholdRule,
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<()> {
        let k = self.rule.k();
        if !(k.is_finite() && k > 0.0) {
            return Err(LoadcastError::ConfigError(format!(
                "anomaly multiplier must be positive, got {}",
                k
            )));
        }
        Ok(())
    }
}

/// Residuals of one evaluation and the indices whose residual exceeds the
/// threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub residuals: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub threshold: f64,
    pub rule: ThresholdRule,
    pub indices: Vec<usize>,
}

impl AnomalyReport {
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn rate(&self) -> f64 {
        if self.residuals.is_empty() {
            0.0
        } else {
            self.indices.len() as f64 / self.residuals.len() as f64
        }
    }

    pub fn is_anomaly(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// Flags points whose absolute forecast error is unusually large for the run
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Score `|actual - predicted|` for aligned original-scale series
    pub fn detect(&self, actual: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<AnomalyReport> {
        if actual.len() != predicted.len() {
            return Err(LoadcastError::shape(
                Stage::AnomalyDetector,
                format!("{} predicted values", actual.len()),
                format!("{} predicted values", predicted.len()),
            ));
        }
        let residuals: Vec<f64> = actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).abs())
            .collect();
        self.detect_residuals(residuals)
    }

    /// Threshold precomputed residuals
    pub fn detect_residuals(&self, residuals: Vec<f64>) -> Result<AnomalyReport> {
        self.config.validate()?;
        if residuals.is_empty() {
            return Err(LoadcastError::input(Stage::AnomalyDetector, "no residuals to score"));
        }
        if let Some(pos) = residuals.iter().position(|r| !r.is_finite()) {
            return Err(LoadcastError::input(
                Stage::AnomalyDetector,
                format!("residual {} is not finite", pos),
            ));
        }

        let n = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let std = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
        let threshold = self.config.rule.threshold(&residuals, mean, std);

        let indices: Vec<usize> = residuals
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r > threshold)
            .map(|(i, _)| i)
            .collect();

        if indices.len() * 10 > residuals.len() {
            warn!(anomalies = indices.len(), points = residuals.len(), "More than 10% of points flagged");
        }
        info!(threshold, mean, std, anomalies = indices.len(), "Scored residuals");

        Ok(AnomalyReport {
            residuals,
            mean,
            std,
            threshold,
            rule: self.config.rule,
            indices,
        })
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
