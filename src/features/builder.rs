//! Causal feature construction from a raw series

use super::calendar::{CalendarFields, CYCLICAL_NAMES};
use super::table::{FeatureSchema, FeatureTable};
use crate::data::{RawSeries, COVARIATE_NAMES};
use crate::error::{LoadcastError, Result, Stage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const TARGET_COLUMN: &str = "total_power";
pub const WEEKEND_COLUMN: &str = "is_weekend";

/// Configuration for lag and rolling features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Lag offsets of the target, in steps
    pub lags: Vec<usize>,
    /// Trailing window for rolling mean / std
    pub rolling_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: vec![1, 24],
            rolling_window: 24,
        }
    }
}

impl FeatureConfig {
    pub fn new(lags: Vec<usize>, rolling_window: usize) -> Self {
        Self {
            lags,
            rolling_window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lags.is_empty() {
            return Err(LoadcastError::ConfigError("at least one lag is required".to_string()));
        }
        if self.lags.contains(&0) {
            return Err(LoadcastError::ConfigError("lag 0 would leak the target".to_string()));
        }
        if self.rolling_window < 2 {
            return Err(LoadcastError::ConfigError(format!(
                "rolling window must be at least 2, got {}",
                self.rolling_window
            )));
        }
        Ok(())
    }

    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// Leading rows whose lag or rolling features are undefined
    pub fn warmup(&self) -> usize {
        self.max_lag().max(self.rolling_window.saturating_sub(1))
    }

    /// Column order: covariates, cyclical encodings, weekend flag, lags,
    /// rolling mean, rolling std, target
    pub fn schema(&self) -> FeatureSchema {
        let mut columns: Vec<String> = COVARIATE_NAMES.iter().map(|c| c.to_string()).collect();
        columns.extend(CYCLICAL_NAMES.iter().map(|c| c.to_string()));
        columns.push(WEEKEND_COLUMN.to_string());
        columns.extend(self.lags.iter().map(|l| format!("{}_lag_{}", TARGET_COLUMN, l)));
        columns.push(format!("{}_rolling_{}_mean", TARGET_COLUMN, self.rolling_window));
        columns.push(format!("{}_rolling_{}_std", TARGET_COLUMN, self.rolling_window));
        FeatureSchema::new(columns, TARGET_COLUMN)
    }
}

/// Derives calendar, lag and rolling features.
///
/// Row `i` only ever reads rows `<= i`. Rows with any undefined value are
/// dropped, never filled.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn schema(&self) -> FeatureSchema {
        self.config.schema()
    }

    /// Build the feature table. An input too short to fill the warm-up
    /// yields an empty table rather than an error.
    pub fn build(&self, series: &RawSeries) -> Result<FeatureTable> {
        self.config.validate()?;

        let schema = self.schema();
        let observations = series.observations();
        let n = observations.len();
        let warmup = self.config.warmup();

        if n <= warmup {
            info!(rows = n, warmup, "Series shorter than feature warm-up, no rows retained");
            return Ok(FeatureTable::empty(schema));
        }

        let target = series.total_power();
        let lagged: Vec<Vec<f64>> = self.config.lags.iter().map(|&l| lag(&target, l)).collect();
        let (roll_mean, roll_std) = rolling_mean_std(&target, self.config.rolling_window);

        let n_cols = schema.len();
        let mut data = Vec::with_capacity((n - warmup) * n_cols);
        let mut timestamps = Vec::with_capacity(n - warmup);
        let mut row = Vec::with_capacity(n_cols);
        let mut dropped_undefined = 0usize;

        for i in warmup..n {
            let obs = &observations[i];
            let calendar = CalendarFields::from_timestamp(&obs.timestamp);

            row.clear();
            row.extend_from_slice(&obs.covariates.to_array());
            row.extend_from_slice(&calendar.cyclical());
            row.push(if calendar.is_weekend() { 1.0 } else { 0.0 });
            row.extend(lagged.iter().map(|l| l[i]));
            row.push(roll_mean[i]);
            row.push(roll_std[i]);
            row.push(target[i]);

            if row.iter().all(|v| v.is_finite()) {
                data.extend_from_slice(&row);
                timestamps.push(obs.timestamp);
            } else {
                dropped_undefined += 1;
            }
        }

        let n_rows = timestamps.len();
        debug!(warmup, dropped_undefined, "Dropped rows without full history");
        info!(input_rows = n, feature_rows = n_rows, columns = n_cols, "Built feature table");

        let values = Array2::from_shape_vec((n_rows, n_cols), data).map_err(|e| {
            LoadcastError::shape(Stage::FeatureBuilder, format!("{} x {}", n_rows, n_cols), e.to_string())
        })?;
        FeatureTable::new(schema, timestamps, values)
    }
}

/// `out[i] = series[i - lag]`, NaN where no such row exists
fn lag(series: &[f64], lag: usize) -> Vec<f64> {
    (0..series.len())
        .map(|i| if i >= lag { series[i - lag] } else { f64::NAN })
        .collect()
}

/// Trailing mean and sample standard deviation over `window` rows ending at
/// each index; NaN until the window is full.
fn rolling_mean_std(series: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let n = series.len();
    let mut means = vec![f64::NAN; n];
    let mut stds = vec![f64::NAN; n];

    for i in (window - 1)..n {
        let values = &series[i + 1 - window..=i];
        let mean = values.iter().sum::<f64>() / window as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        means[i] = mean;
        stds[i] = variance.sqrt();
    }

    (means, stds)
}
