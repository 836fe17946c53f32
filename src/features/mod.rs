//! Feature engineering
//!
//! Turns a [`RawSeries`](crate::data::RawSeries) into a [`FeatureTable`]:
//! - Exogenous covariates
//! - Cyclical hour / day-of-week / month encodings and a weekend flag
//! - Target lags and trailing rolling mean / std
//! - Aggregate target, always the last column

mod builder;
mod calendar;
mod table;

pub use builder::{FeatureBuilder, FeatureConfig, TARGET_COLUMN, WEEKEND_COLUMN};
pub use calendar::{CalendarFields, CYCLICAL_NAMES};
pub use table::{FeatureSchema, FeatureTable};
