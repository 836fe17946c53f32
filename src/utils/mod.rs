//! Utility types

mod metrics;
mod timer;

pub use metrics::ErrorMetrics;
pub use timer::Timer;
