//! Pipeline configuration

use crate::anomaly::{AnomalyConfig, ThresholdRule};
use crate::data::ColumnMapping;
use crate::error::{LoadcastError, Result};
use crate::features::FeatureConfig;
use crate::training::ModelConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a [`Forecaster`](super::Forecaster) run needs.
///
/// Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Source column names for CSV input
    pub columns: ColumnMapping,
    pub features: FeatureConfig,
    /// Rows per model input window
    pub lookback: usize,
    pub model: ModelConfig,
    pub anomaly: AnomalyConfig,
    /// Trailing share of windows held out of training. 0 fits and scores on
    /// the same windows.
    pub holdout_fraction: f64,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            features: FeatureConfig::default(),
            lookback: 24,
            model: ModelConfig::default(),
            anomaly: AnomalyConfig::default(),
            holdout_fraction: 0.0,
        }
    }
}

impl ForecasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_threshold_rule(mut self, rule: ThresholdRule) -> Self {
        self.anomaly.rule = rule;
        self
    }

    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            return Err(LoadcastError::ConfigError("lookback must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(LoadcastError::ConfigError(format!(
                "holdout_fraction must be in [0, 1), got {}",
                self.holdout_fraction
            )));
        }
        self.features.validate()?;
        self.model.validate()?;
        self.anomaly.validate()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{LstmConfig, RidgeConfig};

    #[test]
    fn test_defaults() {
        let config = ForecasterConfig::default();
        assert_eq!(config.lookback, 24);
        assert_eq!(config.features.lags, vec![1, 24]);
        assert_eq!(config.features.rolling_window, 24);
        assert_eq!(config.anomaly.rule, ThresholdRule::MeanStd { k: 3.0 });
        assert_eq!(config.holdout_fraction, 0.0);
        assert_eq!(config.model, ModelConfig::Lstm(LstmConfig::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_and_partial_input() {
        let config = ForecasterConfig::default().with_model(ModelConfig::Ridge(RidgeConfig { alpha: 0.1 }));
        let back: ForecasterConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);

        let partial: ForecasterConfig = serde_json::from_str(r#"{"lookback": 12}"#).unwrap();
        assert_eq!(partial.lookback, 12);
        assert_eq!(partial.features, FeatureConfig::default());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("loadcast_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"model": {"type": "ridge", "alpha": 0.5}, "holdout_fraction": 0.2}"#).unwrap();

        let config = ForecasterConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.model, ModelConfig::Ridge(RidgeConfig { alpha: 0.5 }));
        assert_eq!(config.holdout_fraction, 0.2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ForecasterConfig::default().with_lookback(0).validate().is_err());
        assert!(ForecasterConfig::default().with_holdout_fraction(1.0).validate().is_err());
        assert!(ForecasterConfig::default().with_holdout_fraction(-0.1).validate().is_err());
        assert!(ForecasterConfig::default()
            .with_threshold_rule(ThresholdRule::MeanStd { k: -1.0 })
            .validate()
            .is_err());
        assert!(ForecasterConfig::default()
            .with_features(FeatureConfig::new(vec![0], 24))
            .validate()
            .is_err());
    }
}
