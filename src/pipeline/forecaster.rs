//! End-to-end orchestration

use super::config::ForecasterConfig;
use super::report::{EvaluationReport, ForecastPoint, NextStepForecast};
use crate::anomaly::AnomalyDetector;
use crate::data::RawSeries;
use crate::error::{LoadcastError, Result, Stage};
use crate::features::{FeatureBuilder, FeatureTable};
use crate::preprocessing::{Normalizer, Reconstructor};
use crate::timeseries::{WindowBuilder, WindowSet};
use crate::training::{build_model, ForecastModel};
use crate::utils::{ErrorMetrics, Timer};
use chrono::NaiveDateTime;
use std::borrow::Cow;
use tracing::info;

/// Runs features, scaling, windowing, training, reconstruction and anomaly
/// scoring as one batch job.
///
/// Every `evaluate` refits the normalizer and the model from scratch.
pub struct Forecaster {
    config: ForecasterConfig,
    builder: FeatureBuilder,
    windows: WindowBuilder,
    normalizer: Normalizer,
    model: Box<dyn ForecastModel>,
    detector: AnomalyDetector,
    next: Option<NextStepForecast>,
}

impl std::fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forecaster")
            .field("config", &self.config)
            .field("model", &self.model.name())
            .field("fitted", &self.model.is_fitted())
            .finish()
    }
}

impl Forecaster {
    pub fn new(config: ForecasterConfig) -> Result<Self> {
        let model = build_model(&config.model);
        Self::with_model(config, model)
    }

    /// Use a caller-supplied model instead of the one named in the config
    pub fn with_model(config: ForecasterConfig, model: Box<dyn ForecastModel>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: FeatureBuilder::new(config.features.clone()),
            windows: WindowBuilder::new(config.lookback)?,
            normalizer: Normalizer::new(),
            detector: AnomalyDetector::new(config.anomaly),
            model,
            config,
            next: None,
        })
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn model(&self) -> &dyn ForecastModel {
        self.model.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.normalizer.is_fitted() && self.model.is_fitted()
    }

    /// Fit on `series` and score the fitted model against it.
    ///
    /// The fitted scaling and next-step forecast are replaced only when the
    /// whole run succeeds; after a failure the forecaster reports unfitted.
    pub fn evaluate(&mut self, series: &RawSeries) -> Result<EvaluationReport> {
        self.next = None;
        self.normalizer = Normalizer::new();

        let mut normalizer = Normalizer::new();
        let report = self.run(series, &mut normalizer)?;

        self.normalizer = normalizer;
        self.next = Some(report.next);
        Ok(report)
    }

    fn run(&mut self, series: &RawSeries, normalizer: &mut Normalizer) -> Result<EvaluationReport> {
        if series.is_empty() {
            return Err(LoadcastError::input(Stage::Forecaster, "empty input series"));
        }
        let mut timer = Timer::start("evaluate");

        let table = self.builder.build(series)?;
        if table.is_empty() {
            return Err(LoadcastError::input(
                Stage::FeatureBuilder,
                format!(
                    "no feature rows left from {} observations (warm-up is {} rows)",
                    series.len(),
                    self.config.features.warmup()
                ),
            ));
        }
        timer.checkpoint("features");

        let scaled = normalizer.fit_transform(&table)?;
        let windows = self.windows.build(&scaled)?;
        if windows.is_empty() {
            return Err(LoadcastError::shape(
                Stage::WindowBuilder,
                format!("more than {} feature rows", self.windows.lookback()),
                format!("{} feature rows", scaled.n_rows()),
            ));
        }
        timer.checkpoint("windows");

        let (train, eval) = split(&windows, self.config.holdout_fraction)?;
        let training = self.model.fit(&train)?;
        timer.checkpoint("fit");

        let predicted_norm = self.model.predict(eval.inputs())?;
        let reconstructor = Reconstructor::new(normalizer)?;
        let actual = reconstructor.reconstruct(eval.targets())?;
        let predicted = reconstructor.reconstruct(predicted_norm.view())?;

        let metrics = ErrorMetrics::compute(actual.view(), predicted.view())?;
        let anomalies = self.detector.detect(actual.view(), predicted.view())?;
        let next = self.forecast_from_scaled(normalizer, &scaled)?;
        timer.checkpoint("score");

        let points = eval
            .timestamps()
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| ForecastPoint {
                timestamp,
                actual: actual[i],
                predicted: predicted[i],
                residual: anomalies.residuals[i],
                is_anomaly: anomalies.is_anomaly(i),
            })
            .collect();

        info!(
            model = self.model.name(),
            windows = windows.len(),
            train_windows = train.len(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            anomalies = anomalies.count(),
            next = next.value,
            "Evaluation complete"
        );
        timer.stop();

        Ok(EvaluationReport {
            model: self.model.name().to_string(),
            input_rows: series.len(),
            feature_rows: table.n_rows(),
            windows: windows.len(),
            train_windows: train.len(),
            points,
            metrics,
            anomalies,
            next,
            training,
        })
    }

    /// The one-step forecast computed by the last `evaluate`
    pub fn forecast_next(&self) -> Result<NextStepForecast> {
        self.next.ok_or(LoadcastError::StateError { stage: Stage::Forecaster })
    }

    /// Forecast one step past a newer series with the already-fitted
    /// normalizer and model
    pub fn forecast_next_from(&self, series: &RawSeries) -> Result<NextStepForecast> {
        if !self.is_fitted() {
            return Err(LoadcastError::StateError { stage: Stage::Forecaster });
        }
        let table = self.builder.build(series)?;
        // two rows are needed to infer the sampling step
        let required = self.windows.lookback().max(2);
        if table.n_rows() < required {
            return Err(LoadcastError::input(
                Stage::Forecaster,
                format!(
                    "need {} feature rows for a forecast window, have {}",
                    required,
                    table.n_rows()
                ),
            ));
        }
        let scaled = self.normalizer.transform(&table)?;
        self.forecast_from_scaled(&self.normalizer, &scaled)
    }

    fn forecast_from_scaled(&self, normalizer: &Normalizer, scaled: &FeatureTable) -> Result<NextStepForecast> {
        let block = self.windows.latest(scaled)?;
        let prediction = self.model.predict(block.view())?;
        let value = Reconstructor::new(normalizer)?.reconstruct_one(prediction[0])?;
        Ok(NextStepForecast {
            timestamp: next_timestamp(scaled.timestamps())?,
            value,
        })
    }
}

/// Leading windows for training, trailing ones for scoring. Without a
/// holdout both halves borrow the full set.
fn split(windows: &WindowSet, fraction: f64) -> Result<(Cow<'_, WindowSet>, Cow<'_, WindowSet>)> {
    if fraction <= 0.0 {
        return Ok((Cow::Borrowed(windows), Cow::Borrowed(windows)));
    }

    let n = windows.len();
    let n_eval = ((n as f64) * fraction).ceil() as usize;
    if n_eval >= n {
        return Err(LoadcastError::input(
            Stage::Forecaster,
            format!("holdout of {} leaves no training windows out of {}", fraction, n),
        ));
    }
    let (train, eval) = windows.split_at(n - n_eval);
    Ok((Cow::Owned(train), Cow::Owned(eval)))
}

/// Last timestamp plus the last observed step
fn next_timestamp(timestamps: &[NaiveDateTime]) -> Result<NaiveDateTime> {
    match timestamps {
        [.., prev, last] => Ok(*last + (*last - *prev)),
        _ => Err(LoadcastError::input(
            Stage::Forecaster,
            "need at least two rows to infer the sampling step",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Covariates, Observation};
    use crate::training::{ModelConfig, RidgeConfig};
    use chrono::{Duration, NaiveDate};

    fn hourly(n: usize) -> RawSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let v = 50.0 + 10.0 * (i as f64 * std::f64::consts::PI / 12.0).cos();
                Observation::new(start + Duration::hours(i as i64), Covariates::default(), [v, v / 2.0, 1.0])
            })
            .collect()
    }

    fn ridge() -> ForecasterConfig {
        ForecasterConfig::default().with_model(ModelConfig::Ridge(RidgeConfig { alpha: 1e-4 }))
    }

    #[test]
    fn test_next_timestamp() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let ts = vec![t0, t0 + Duration::minutes(10), t0 + Duration::minutes(20)];
        assert_eq!(next_timestamp(&ts).unwrap(), t0 + Duration::minutes(30));
        assert!(next_timestamp(&ts[..1]).is_err());
    }

    #[test]
    fn test_forecast_next_requires_evaluate() {
        let forecaster = Forecaster::new(ridge()).unwrap();
        assert!(matches!(
            forecaster.forecast_next(),
            Err(LoadcastError::StateError { stage: Stage::Forecaster })
        ));
        assert!(forecaster.forecast_next_from(&hourly(100)).is_err());
    }

    #[test]
    fn test_holdout_scores_only_trailing_windows() {
        let mut forecaster = Forecaster::new(ridge().with_holdout_fraction(0.25)).unwrap();
        let report = forecaster.evaluate(&hourly(150)).unwrap();

        // 150 - 24 warm-up rows, minus the 24-row lookback
        assert_eq!(report.windows, 102);
        assert_eq!(report.holdout_windows(), 26);
        assert_eq!(report.points.len(), 26);
        assert_eq!(report.train_windows, 76);
    }

    #[test]
    fn test_window_shortage_is_shape_error() {
        let mut forecaster = Forecaster::new(ridge()).unwrap();
        // 40 rows leave 16 feature rows, fewer than the lookback
        let err = forecaster.evaluate(&hourly(40)).unwrap_err();
        assert!(matches!(err, LoadcastError::ShapeError { stage: Stage::WindowBuilder, .. }));
    }

    #[test]
    fn test_failed_evaluate_leaves_forecaster_unfitted() {
        let mut forecaster = Forecaster::new(ridge().with_holdout_fraction(0.5)).unwrap();
        forecaster.evaluate(&hourly(150)).unwrap();
        assert!(forecaster.forecast_next().is_ok());

        // 49 rows leave a single window, nothing to train on after the holdout
        let scaled_up: RawSeries = hourly(49)
            .observations()
            .iter()
            .map(|o| Observation::new(o.timestamp, o.covariates, o.zone_power.map(|v| v * 1000.0)))
            .collect();
        assert!(forecaster.evaluate(&scaled_up).is_err());

        assert!(matches!(
            forecaster.forecast_next(),
            Err(LoadcastError::StateError { stage: Stage::Forecaster })
        ));
        assert!(!forecaster.is_fitted());
        assert!(matches!(
            forecaster.forecast_next_from(&hourly(150)),
            Err(LoadcastError::StateError { stage: Stage::Forecaster })
        ));

        // a later successful run restores a consistent state
        forecaster.evaluate(&hourly(150)).unwrap();
        assert!(forecaster.forecast_next().is_ok());
    }

    #[test]
    fn test_in_sample_split_borrows() {
        let windows = WindowBuilder::new(2).unwrap().build(
            &FeatureBuilder::default().build(&hourly(40)).unwrap(),
        ).unwrap();

        let (train, eval) = split(&windows, 0.0).unwrap();
        assert!(matches!(train, Cow::Borrowed(_)));
        assert!(matches!(eval, Cow::Borrowed(_)));

        let (train, eval) = split(&windows, 0.25).unwrap();
        assert_eq!(train.len() + eval.len(), windows.len());
        assert_eq!(eval.len(), 4);
        assert!(split(&windows, 0.99).is_err());
    }

    #[test]
    fn test_forecast_next_from_needs_two_rows() {
        let mut forecaster = Forecaster::new(ridge().with_lookback(1)).unwrap();
        forecaster.evaluate(&hourly(40)).unwrap();

        // 25 rows leave one feature row, too few to infer the step
        let err = forecaster.forecast_next_from(&hourly(25)).unwrap_err();
        match err {
            LoadcastError::InputError { stage, reason } => {
                assert_eq!(stage, Stage::Forecaster);
                assert!(reason.contains("need 2 feature rows"), "{}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(forecaster.forecast_next_from(&hourly(26)).is_ok());
    }

    #[test]
    fn test_forecast_next_from_newer_series() {
        let mut forecaster = Forecaster::new(ridge()).unwrap();
        forecaster.evaluate(&hourly(120)).unwrap();

        let longer = hourly(121);
        let next = forecaster.forecast_next_from(&longer).unwrap();
        let last = longer.last_timestamp().unwrap();
        assert_eq!(next.timestamp, last + Duration::hours(1));
        assert!(next.value.is_finite());
    }
}
