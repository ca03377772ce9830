use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Dense `[steps, features]` array stored row-major. Missing values are NaN.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesArray {
    values: Vec<f32>,
    n_steps: usize,
    n_features: usize,
}

impl SeriesArray {
    pub fn new(values: Vec<f32>, n_steps: usize, n_features: usize) -> Result<Self> {
        if values.len() != n_steps * n_features {
            return Err(DatasetError::ShapeMismatch {
                field: "X",
                expected: vec![n_steps * n_features],
                got: vec![values.len()],
            });
        }

        Ok(Self {
            values,
            n_steps,
            n_features,
        })
    }

    pub fn filled(value: f32, n_steps: usize, n_features: usize) -> Self {
        Self {
            values: vec![value; n_steps * n_features],
            n_steps,
            n_features,
        }
    }

    /// Builds an array from per-step rows, all of which must have the same width.
    /// `field` names the source in shape errors.
    pub fn from_rows(field: &'static str, rows: Vec<Vec<f32>>) -> Result<Self> {
        let n_steps = rows.len();
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);

        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(DatasetError::ShapeMismatch {
                field,
                expected: vec![n_steps, n_features],
                got: vec![n_steps, bad.len()],
            });
        }

        Ok(Self {
            values: rows.into_iter().flatten().collect(),
            n_steps,
            n_features,
        })
    }

    /// Same as [`SeriesArray::from_rows`] but `None` marks a missing value.
    pub fn from_nullable_rows(field: &'static str, rows: Vec<Vec<Option<f32>>>) -> Result<Self> {
        Self::from_rows(
            field,
            rows.into_iter()
                .map(|row| row.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
                .collect(),
        )
    }

    pub fn to_nullable_rows(&self) -> Vec<Vec<Option<f32>>> {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect()
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.n_steps, self.n_features]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn get(&self, step: usize, feature: usize) -> Option<f32> {
        if step >= self.n_steps || feature >= self.n_features {
            return None;
        }
        self.values.get(step * self.n_features + feature).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks(0) panics, and a zero-width array has no meaningful rows anyway
        self.values.chunks(self.n_features.max(1))
    }

    /// 1.0 where a value is present, 0.0 where it is NaN.
    pub fn observed_mask(&self) -> SeriesArray {
        self.map(|v| if v.is_nan() { 0.0 } else { 1.0 })
    }

    /// Replaces NaN with `fill`.
    pub fn nan_to_num(&self, fill: f32) -> SeriesArray {
        self.map(|v| if v.is_nan() { fill } else { v })
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> SeriesArray {
        SeriesArray {
            values: self.values.iter().map(|v| f(*v)).collect(),
            n_steps: self.n_steps,
            n_features: self.n_features,
        }
    }

    /// Elementwise sum of two arrays of the same shape.
    pub fn add(&self, other: &SeriesArray) -> Result<SeriesArray> {
        self.check_shape("mask", other)?;

        Ok(SeriesArray {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| a + b)
                .collect(),
            n_steps: self.n_steps,
            n_features: self.n_features,
        })
    }

    pub(crate) fn check_shape(&self, field: &'static str, other: &SeriesArray) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(DatasetError::ShapeMismatch {
                field,
                expected: self.shape().to_vec(),
                got: other.shape().to_vec(),
            });
        }
        Ok(())
    }

    pub(crate) fn expect_shape(&self, field: &'static str, n_steps: usize, n_features: usize) -> Result<()> {
        if self.shape() != [n_steps, n_features] {
            return Err(DatasetError::ShapeMismatch {
                field,
                expected: vec![n_steps, n_features],
                got: self.shape().to_vec(),
            });
        }
        Ok(())
    }
}
