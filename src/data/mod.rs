//! Raw series model and loading
//!
//! - [`RawSeries`] - causally ordered, deduplicated observations
//! - [`SeriesLoader`] - CSV / DataFrame ingestion with mixed timestamp formats

mod loader;
mod series;

pub use loader::{parse_timestamp, ColumnMapping, SeriesLoader};
pub use series::{Covariates, Observation, RawSeries, COVARIATE_NAMES, N_COVARIATES};
