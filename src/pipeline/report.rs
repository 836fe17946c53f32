//! Evaluation outputs

use crate::anomaly::AnomalyReport;
use crate::training::TrainingSummary;
use crate::utils::ErrorMetrics;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One aligned evaluation point, original units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
    pub is_anomaly: bool,
}

/// One-step-ahead forecast past the last available row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NextStepForecast {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Result of [`Forecaster::evaluate`](super::Forecaster::evaluate)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model: String,
    pub input_rows: usize,
    pub feature_rows: usize,
    pub windows: usize,
    pub train_windows: usize,
    pub points: Vec<ForecastPoint>,
    pub metrics: ErrorMetrics,
    pub anomalies: AnomalyReport,
    pub next: NextStepForecast,
    pub training: TrainingSummary,
}

impl EvaluationReport {
    pub fn actual(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.actual).collect()
    }

    pub fn predicted(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted).collect()
    }

    pub fn anomalous_points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_anomaly)
    }

    /// Windows scored but not trained on
    pub fn holdout_windows(&self) -> usize {
        self.windows.saturating_sub(self.train_windows)
    }
}
