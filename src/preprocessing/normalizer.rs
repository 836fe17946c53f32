//! Per-column min-max scaling with a single-column inverse

use crate::error::{LoadcastError, Result, Stage};
use crate::features::{FeatureSchema, FeatureTable};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative width under which a column is treated as constant
const DEGENERATE_RANGE: f64 = 1e-12;

/// Fitted range of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Constant columns scale to 0 and invert to their single value
    pub fn is_degenerate(&self) -> bool {
        let magnitude = 1.0f64.max(self.min.abs()).max(self.max.abs());
        self.range() <= DEGENERATE_RANGE * magnitude
    }

    pub fn scale(&self, v: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (v - self.min) / self.range()
        }
    }

    /// Linear inverse; values outside [0, 1] extrapolate
    pub fn unscale(&self, v: f64) -> f64 {
        if self.is_degenerate() {
            self.min
        } else {
            v * self.range() + self.min
        }
    }
}

/// Per-column ranges learned from one feature table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    schema: FeatureSchema,
    ranges: Vec<ColumnRange>,
}

impl ScaleParams {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn range(&self, column: usize) -> Option<&ColumnRange> {
        self.ranges.get(column)
    }
}

/// Min-max normaliser to [0, 1].
///
/// Fit once; every transform or inverse afterwards uses the same params and
/// fails with a `StateError` before fitting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Normalizer {
    params: Option<ScaleParams>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Result<&ScaleParams> {
        self.params
            .as_ref()
            .ok_or(LoadcastError::StateError { stage: Stage::Normalizer })
    }

    /// Learn per-column min and max over every row
    pub fn fit(&mut self, table: &FeatureTable) -> Result<&ScaleParams> {
        if table.is_empty() {
            return Err(LoadcastError::input(Stage::Normalizer, "cannot fit on an empty feature table"));
        }

        let ranges: Vec<ColumnRange> = table
            .values()
            .axis_iter(Axis(1))
            .map(|col| ColumnRange {
                min: col.iter().copied().fold(f64::INFINITY, f64::min),
                max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
            .collect();

        let degenerate = ranges.iter().filter(|r| r.is_degenerate()).count();
        debug!(columns = ranges.len(), degenerate, "Fitted normalizer");

        Ok(&*self.params.insert(ScaleParams {
            schema: table.schema().clone(),
            ranges,
        }))
    }

    /// Scale every column into [0, 1] (fitted rows) using the fitted ranges
    pub fn transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        let params = self.params()?;
        params.schema.ensure_matches(table.schema(), Stage::Normalizer)?;

        let mut values: Array2<f64> = table.values().to_owned();
        for (mut col, range) in values.axis_iter_mut(Axis(1)).zip(params.ranges.iter()) {
            col.mapv_inplace(|v| range.scale(v));
        }
        Ok(table.with_values(values))
    }

    pub fn fit_transform(&mut self, table: &FeatureTable) -> Result<FeatureTable> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Map a whole normalised table back to the original scale
    pub fn inverse_transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        let params = self.params()?;
        params.schema.ensure_matches(table.schema(), Stage::Normalizer)?;

        let mut values: Array2<f64> = table.values().to_owned();
        for (mut col, range) in values.axis_iter_mut(Axis(1)).zip(params.ranges.iter()) {
            col.mapv_inplace(|v| range.unscale(v));
        }
        Ok(table.with_values(values))
    }

    /// Invert values of a single column.
    ///
    /// Only that column's (min, max) is read, so scalar predictions for the
    /// target can be restored without building full rows.
    pub fn inverse(&self, values: ArrayView1<'_, f64>, column: usize) -> Result<Array1<f64>> {
        let range = self.column_range(column)?;
        Ok(values.mapv(|v| range.unscale(v)))
    }

    /// Scale a single value of `column`
    pub fn transform_value(&self, value: f64, column: usize) -> Result<f64> {
        Ok(self.column_range(column)?.scale(value))
    }

    fn column_range(&self, column: usize) -> Result<&ColumnRange> {
        let params = self.params()?;
        params.range(column).ok_or_else(|| {
            LoadcastError::shape(
                Stage::Normalizer,
                format!("column index < {}", params.ranges.len()),
                format!("column index {}", column),
            )
        })
    }
}
