//! loadcast - aggregate power-draw forecasting with residual anomaly detection
//!
//! The pipeline turns a timestamped series of zone power readings and
//! weather covariates into a one-step-ahead forecast of total power and a
//! set of anomalous points:
//!
//! 1. [`features`] - causal calendar, lag and rolling features
//! 2. [`preprocessing`] - min-max scaling and target reconstruction
//! 3. [`timeseries`] - fixed-length lookback windows
//! 4. [`training`] - LSTM and ridge sequence regressors
//! 5. [`anomaly`] - residual thresholding
//! 6. [`pipeline`] - the [`Forecaster`](pipeline::Forecaster) orchestrator
//!
//! [`data`] loads CSV input through polars; [`cli`] is the command-line
//! front end.
//!
//! ```no_run
//! use loadcast::prelude::*;
//!
//! # fn main() -> loadcast::Result<()> {
//! let series = SeriesLoader::new().load_csv("powerconsumption.csv")?;
//! let mut forecaster = Forecaster::new(ForecasterConfig::default())?;
//! let report = forecaster.evaluate(&series)?;
//! println!("MAE {:.2}, next {:.2}", report.metrics.mae, report.next.value);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub mod data;
pub mod features;
pub mod preprocessing;
pub mod timeseries;
pub mod training;
pub mod anomaly;
pub mod pipeline;

pub mod utils;
pub mod cli;

pub use error::{LoadcastError, Result, Stage};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{LoadcastError, Result, Stage};

    pub use crate::data::{ColumnMapping, Covariates, Observation, RawSeries, SeriesLoader};
    pub use crate::features::{FeatureBuilder, FeatureConfig, FeatureSchema, FeatureTable};
    pub use crate::preprocessing::{Normalizer, Reconstructor, ScaleParams};
    pub use crate::timeseries::{WindowBuilder, WindowSet};
    pub use crate::training::{
        build_model, ForecastModel, LstmConfig, LstmRegressor, ModelConfig, RidgeConfig, RidgeRegressor,
        TrainingSummary,
    };
    pub use crate::anomaly::{AnomalyConfig, AnomalyDetector, AnomalyReport, ThresholdRule};
    pub use crate::pipeline::{EvaluationReport, ForecastPoint, Forecaster, ForecasterConfig, NextStepForecast};
    pub use crate::utils::{ErrorMetrics, Timer};
}
