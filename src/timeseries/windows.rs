//! Sliding lookback windows over a feature table

use crate::error::{LoadcastError, Result, Stage};
use crate::features::FeatureTable;
use chrono::NaiveDateTime;
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Supervised samples: `inputs[i]` is the `lookback x features` block of
/// rows `i..i + lookback`, `targets[i]` is the target of row `i + lookback`.
///
/// Samples stay in temporal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSet {
    inputs: Array3<f64>,
    targets: Array1<f64>,
    /// Timestamp of each label row
    timestamps: Vec<NaiveDateTime>,
}

impl WindowSet {
    pub fn new(inputs: Array3<f64>, targets: Array1<f64>, timestamps: Vec<NaiveDateTime>) -> Result<Self> {
        let n = inputs.len_of(Axis(0));
        if targets.len() != n || timestamps.len() != n {
            return Err(LoadcastError::shape(
                Stage::WindowBuilder,
                format!("{} targets and timestamps", n),
                format!("{} targets, {} timestamps", targets.len(), timestamps.len()),
            ));
        }
        Ok(Self {
            inputs,
            targets,
            timestamps,
        })
    }

    pub fn empty(lookback: usize, n_features: usize) -> Self {
        Self {
            inputs: Array3::zeros((0, lookback, n_features)),
            targets: Array1::zeros(0),
            timestamps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.inputs.len_of(Axis(1))
    }

    pub fn n_features(&self) -> usize {
        self.inputs.len_of(Axis(2))
    }

    pub fn inputs(&self) -> ArrayView3<'_, f64> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView1<'_, f64> {
        self.targets.view()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Split into `[0, at)` and `[at, len)` without reordering
    pub fn split_at(&self, at: usize) -> (WindowSet, WindowSet) {
        let at = at.min(self.len());
        let head = WindowSet {
            inputs: self.inputs.slice(s![..at, .., ..]).to_owned(),
            targets: self.targets.slice(s![..at]).to_owned(),
            timestamps: self.timestamps[..at].to_vec(),
        };
        let tail = WindowSet {
            inputs: self.inputs.slice(s![at.., .., ..]).to_owned(),
            targets: self.targets.slice(s![at..]).to_owned(),
            timestamps: self.timestamps[at..].to_vec(),
        };
        (head, tail)
    }
}

/// Builds [`WindowSet`]s of a fixed lookback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBuilder {
    lookback: usize,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self { lookback: 24 }
    }
}

impl WindowBuilder {
    pub fn new(lookback: usize) -> Result<Self> {
        if lookback == 0 {
            return Err(LoadcastError::ConfigError("lookback must be at least 1".to_string()));
        }
        Ok(Self { lookback })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Number of windows a table of `n_rows` yields
    pub fn count(&self, n_rows: usize) -> usize {
        n_rows.saturating_sub(self.lookback)
    }

    /// Window the (normally normalised) table. A table with no more rows
    /// than the lookback yields an empty set.
    pub fn build(&self, table: &FeatureTable) -> Result<WindowSet> {
        let n_rows = table.n_rows();
        let n_features = table.n_cols();
        let n_windows = self.count(n_rows);

        if n_windows == 0 {
            info!(rows = n_rows, lookback = self.lookback, "Too few rows for a single window");
            return Ok(WindowSet::empty(self.lookback, n_features));
        }

        let values = table.values();
        let target_col = table.schema().target_index();

        let mut inputs = Array3::zeros((n_windows, self.lookback, n_features));
        for (i, mut window) in inputs.axis_iter_mut(Axis(0)).enumerate() {
            window.assign(&values.slice(s![i..i + self.lookback, ..]));
        }
        let targets = values.slice(s![self.lookback.., target_col]).to_owned();
        let timestamps = table.timestamps()[self.lookback..].to_vec();

        debug!(windows = n_windows, lookback = self.lookback, features = n_features, "Built windows");
        WindowSet::new(inputs, targets, timestamps)
    }

    /// The most recent `lookback` rows as a single `1 x lookback x features`
    /// block, used to forecast one step past the table.
    pub fn latest(&self, table: &FeatureTable) -> Result<Array3<f64>> {
        let n_rows = table.n_rows();
        if n_rows < self.lookback {
            return Err(LoadcastError::input(
                Stage::WindowBuilder,
                format!("need {} rows for a forecast window, have {}", self.lookback, n_rows),
            ));
        }
        let block = table.values().slice(s![n_rows - self.lookback.., ..]).to_owned();
        Ok(block.insert_axis(Axis(0)))
    }
}
