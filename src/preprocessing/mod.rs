//! Feature scaling
//!
//! - [`Normalizer`] - per-column min-max scaling, fitted once
//! - [`Reconstructor`] - restores target-column scalars to original units

mod normalizer;
mod reconstructor;

pub use normalizer::{ColumnRange, Normalizer, ScaleParams};
pub use reconstructor::Reconstructor;
