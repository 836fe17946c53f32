//! Forecast error metrics

use crate::error::{LoadcastError, Result, Stage};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Error summary over aligned actual / predicted series, in original units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Coefficient of determination; 0 when the actual series is constant
    pub r2: f64,
    pub n: usize,
}

impl ErrorMetrics {
    pub fn compute(actual: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(LoadcastError::shape(
                Stage::Forecaster,
                format!("{} predictions", actual.len()),
                format!("{} predictions", predicted.len()),
            ));
        }
        let n = actual.len();
        if n == 0 {
            return Err(LoadcastError::input(Stage::Forecaster, "no points to score"));
        }

        let nf = n as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (a, p) in actual.iter().zip(predicted.iter()) {
            let e = a - p;
            abs_sum += e.abs();
            sq_sum += e * e;
        }

        let mean = actual.sum() / nf;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - sq_sum / ss_tot } else { 0.0 };

        Ok(Self {
            mae: abs_sum / nf,
            rmse: (sq_sum / nf).sqrt(),
            r2,
            n,
        })
    }
}
