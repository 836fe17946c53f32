//! Residual-based anomaly detection
//!
//! A point is anomalous when its absolute forecast error exceeds a
//! threshold recomputed from the residuals of the same run.

mod residual;

pub use residual::{AnomalyConfig, AnomalyDetector, AnomalyReport, ThresholdRule};
