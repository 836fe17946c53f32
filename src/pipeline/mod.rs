//! Forecasting pipeline
//!
//! [`Forecaster`] wires the stages together:
//! raw series → features → normalizer → windows → model → reconstruction →
//! error metrics and anomaly report, plus a one-step-ahead forecast.

mod config;
mod forecaster;
mod report;

pub use config::ForecasterConfig;
pub use forecaster::Forecaster;
pub use report::{EvaluationReport, ForecastPoint, NextStepForecast};
