//! Restore normalised target values to the original scale

use super::normalizer::Normalizer;
use crate::error::{LoadcastError, Result, Stage};
use ndarray::{Array1, ArrayView1};

/// Maps normalised target-column scalars (predictions or labels) back to
/// original units through [`Normalizer::inverse`] on the target column.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a> {
    normalizer: &'a Normalizer,
    target_index: usize,
}

impl<'a> Reconstructor<'a> {
    /// The target column is taken from the fitted schema
    pub fn new(normalizer: &'a Normalizer) -> Result<Self> {
        let params = normalizer
            .params()
            .map_err(|_| LoadcastError::StateError { stage: Stage::Reconstructor })?;
        Ok(Self {
            normalizer,
            target_index: params.schema().target_index(),
        })
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn reconstruct(&self, normalized: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.normalizer.inverse(normalized, self.target_index)
    }

    pub fn reconstruct_one(&self, normalized: f64) -> Result<f64> {
        let restored = self.reconstruct(ArrayView1::from(&[normalized]))?;
        Ok(restored[0])
    }
}
