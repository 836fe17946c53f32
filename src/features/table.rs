//! Feature table with an explicit, checked column order

use crate::error::{LoadcastError, Result, Stage};
use chrono::NaiveDateTime;
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Ordered column names of a feature table. The target is always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from feature columns followed by the target column
    pub fn new(features: Vec<String>, target: impl Into<String>) -> Self {
        let mut columns = features;
        columns.push(target.into());
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn target_index(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    pub fn target_name(&self) -> &str {
        self.columns.last().map(String::as_str).unwrap_or("")
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Fail with a `ShapeError` naming `stage` unless `other` matches exactly
    pub fn ensure_matches(&self, other: &FeatureSchema, stage: Stage) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(LoadcastError::shape(
            stage,
            format!("{} columns [{}]", self.len(), self.columns.join(", ")),
            format!("{} columns [{}]", other.len(), other.columns.join(", ")),
        ))
    }
}

/// Rows of derived features, one per retained timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    schema: FeatureSchema,
    timestamps: Vec<NaiveDateTime>,
    values: Array2<f64>,
}

impl FeatureTable {
    pub fn new(
        schema: FeatureSchema,
        timestamps: Vec<NaiveDateTime>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.ncols() != schema.len() {
            return Err(LoadcastError::shape(
                Stage::FeatureBuilder,
                format!("{} columns", schema.len()),
                format!("{} columns", values.ncols()),
            ));
        }
        if values.nrows() != timestamps.len() {
            return Err(LoadcastError::shape(
                Stage::FeatureBuilder,
                format!("{} rows", timestamps.len()),
                format!("{} rows", values.nrows()),
            ));
        }
        Ok(Self {
            schema,
            timestamps,
            values,
        })
    }

    pub fn empty(schema: FeatureSchema) -> Self {
        let n_cols = schema.len();
        Self {
            schema,
            timestamps: Vec::new(),
            values: Array2::zeros((0, n_cols)),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.column(index)
    }

    pub fn target(&self) -> ArrayView1<'_, f64> {
        self.values.column(self.schema.target_index())
    }

    /// Last `n` rows, or every row if the table is shorter
    pub fn tail(&self, n: usize) -> FeatureTable {
        let start = self.n_rows().saturating_sub(n);
        FeatureTable {
            schema: self.schema.clone(),
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values.slice(s![start.., ..]).to_owned(),
        }
    }

    /// Same rows and schema with new values
    pub(crate) fn with_values(&self, values: Array2<f64>) -> FeatureTable {
        FeatureTable {
            schema: self.schema.clone(),
            timestamps: self.timestamps.clone(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn ts(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n).map(|i| start + chrono::Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_target_is_last() {
        let schema = FeatureSchema::new(vec!["a".into(), "b".into()], "y");
        assert_eq!(schema.target_index(), 2);
        assert_eq!(schema.target_name(), "y");
        assert_eq!(schema.index_of("b"), Some(1));
    }

    #[test]
    fn test_schema_mismatch_is_shape_error() {
        let fit = FeatureSchema::new(vec!["a".into(), "b".into()], "y");
        let infer = FeatureSchema::new(vec!["a".into()], "y");

        let err = fit.ensure_matches(&infer, Stage::Normalizer).unwrap_err();
        assert!(matches!(err, LoadcastError::ShapeError { stage: Stage::Normalizer, .. }));
        assert!(fit.ensure_matches(&fit.clone(), Stage::Normalizer).is_ok());
    }

    #[test]
    fn test_table_tail() {
        let schema = FeatureSchema::new(vec!["a".into()], "y");
        let table = FeatureTable::new(schema, ts(3), array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]).unwrap();

        let tail = table.tail(2);
        assert_eq!(tail.n_rows(), 2);
        assert_eq!(tail.target().to_vec(), vec![20.0, 30.0]);
        assert_eq!(table.tail(10).n_rows(), 3);
    }

    #[test]
    fn test_column_count_checked() {
        let schema = FeatureSchema::new(vec!["a".into()], "y");
        assert!(FeatureTable::new(schema, ts(1), array![[1.0, 2.0, 3.0]]).is_err());
    }
}
