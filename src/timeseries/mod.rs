//! Time series windowing
//!
//! Turns a feature table into supervised `(lookback x features) -> target`
//! samples without reordering rows.

mod windows;

pub use windows::{WindowBuilder, WindowSet};
