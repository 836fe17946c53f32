//! Ridge regression over flattened lookback windows

use super::linalg::{cholesky_solve, matrix_inverse};
use super::{check_features, check_training_set, mse, ForecastModel, TrainingSummary};
use crate::error::{LoadcastError, Result, Stage};
use crate::timeseries::WindowSet;
use crate::utils::Timer;
use ndarray::{Array1, Array2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeConfig {
    /// L2 penalty on the coefficients; the intercept is not penalised
    pub alpha: f64,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self { alpha: 1e-3 }
    }
}

impl RidgeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(LoadcastError::ConfigError(format!(
                "ridge alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RidgeFit {
    lookback: usize,
    n_features: usize,
    coefficients: Array1<f64>,
    intercept: f64,
}

/// Linear baseline: every window is flattened row-major into one vector of
/// `lookback * features` inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RidgeRegressor {
    config: RidgeConfig,
    fitted: Option<RidgeFit>,
}

impl RidgeRegressor {
    pub fn new(config: RidgeConfig) -> Self {
        Self { config, fitted: None }
    }

    pub fn config(&self) -> &RidgeConfig {
        &self.config
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.coefficients)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }

    fn solve(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, f64)> {
        let n_inputs = x.ncols();
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| LoadcastError::input(Stage::ForecastModel, "no training windows"))?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        for i in 0..n_inputs {
            xtx[[i, i]] += self.config.alpha;
        }
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = match cholesky_solve(&xtx, &xty) {
            Some(c) => c,
            None => matrix_inverse(&xtx).map(|inv| inv.dot(&xty)).ok_or_else(|| {
                LoadcastError::ComputationError(
                    "normal equations are singular; increase the ridge alpha".to_string(),
                )
            })?,
        };
        let intercept = y_mean - coefficients.dot(&x_mean);
        Ok((coefficients, intercept))
    }
}

fn flatten(inputs: &ArrayView3<'_, f64>) -> Result<Array2<f64>> {
    let (n, lookback, n_features) = inputs.dim();
    inputs
        .to_shape((n, lookback * n_features))
        .map(|flat| flat.into_owned())
        .map_err(|e| {
            LoadcastError::shape(Stage::ForecastModel, format!("{} x {}", n, lookback * n_features), e.to_string())
        })
}

impl ForecastModel for RidgeRegressor {
    fn fit(&mut self, windows: &WindowSet) -> Result<TrainingSummary> {
        check_training_set(windows)?;
        let timer = Timer::start("ridge fit");

        let inputs = windows.inputs();
        let x = flatten(&inputs)?;
        let y = windows.targets().to_owned();
        let (coefficients, intercept) = self.solve(&x, &y)?;

        let loss = mse(&(x.dot(&coefficients) + intercept), windows.targets());
        self.fitted = Some(RidgeFit {
            lookback: windows.lookback(),
            n_features: windows.n_features(),
            coefficients,
            intercept,
        });

        info!(samples = windows.len(), inputs = x.ncols(), loss, "Fitted ridge regressor");
        Ok(TrainingSummary {
            model: self.name().to_string(),
            samples: windows.len(),
            epochs: 1,
            loss_history: vec![loss],
            final_loss: loss,
            duration_secs: timer.elapsed_secs(),
        })
    }

    fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array1<f64>> {
        let fit = self
            .fitted
            .as_ref()
            .ok_or(LoadcastError::StateError { stage: Stage::ForecastModel })?;
        check_features(&inputs, fit.n_features)?;

        let (_, lookback, _) = inputs.dim();
        if lookback != fit.lookback {
            return Err(LoadcastError::shape(
                Stage::ForecastModel,
                format!("lookback {}", fit.lookback),
                format!("lookback {}", lookback),
            ));
        }

        Ok(flatten(&inputs)?.dot(&fit.coefficients) + fit.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> &'static str {
        "ridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use ndarray::Array3;

    /// Label = 2 * (first step, feature 0) - (last step, feature 1) + 0.5
    fn linear_windows(n: usize) -> WindowSet {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let inputs = Array3::from_shape_fn((n, 3, 2), |(i, t, f)| {
            ((i * 7 + t * 3 + f * 4) % 11) as f64 / 11.0 + (i as f64 * 0.01)
        });
        let targets: Array1<f64> = (0..n)
            .map(|i| 2.0 * inputs[[i, 0, 0]] - inputs[[i, 2, 1]] + 0.5)
            .collect();
        let ts = (0..n).map(|i| start + Duration::hours(i as i64)).collect();
        WindowSet::new(inputs, targets, ts).unwrap()
    }

    #[test]
    fn test_recovers_linear_relation() {
        let windows = linear_windows(60);
        let mut model = RidgeRegressor::new(RidgeConfig { alpha: 1e-8 });
        let summary = model.fit(&windows).unwrap();

        assert!(summary.final_loss < 1e-10);
        let pred = model.predict(windows.inputs()).unwrap();
        for (p, t) in pred.iter().zip(windows.targets().iter()) {
            assert!((p - t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RidgeRegressor::default();
        let windows = linear_windows(5);
        assert!(matches!(
            model.predict(windows.inputs()),
            Err(LoadcastError::StateError { stage: Stage::ForecastModel })
        ));
    }

    #[test]
    fn test_feature_mismatch() {
        let mut model = RidgeRegressor::default();
        model.fit(&linear_windows(20)).unwrap();

        let wrong = Array3::<f64>::zeros((2, 3, 4));
        assert!(matches!(model.predict(wrong.view()), Err(LoadcastError::ShapeError { .. })));
    }

    #[test]
    fn test_negative_alpha_rejected() {
        assert!(RidgeConfig { alpha: -1.0 }.validate().is_err());
        assert!(RidgeConfig { alpha: f64::NAN }.validate().is_err());
    }
}
