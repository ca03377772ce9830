use std::fmt;

use super::series::SeriesArray;
use crate::error::{DatasetError, Result};

pub const KEY_X: &str = "X";
pub const KEY_Y: &str = "y";
pub const KEY_TIME_POINTS: &str = "time_points";
pub const KEY_FOR_PATTERN_MASK: &str = "for_pattern_mask";
pub const KEY_CUT_LENGTH: &str = "cut_length";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    InMemory,
    LazyFile,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::InMemory => write!(f, "in-memory"),
            StorageMode::LazyFile => write!(f, "lazy-file"),
        }
    }
}

/// Which optional fields a source carries. Resolved once when the source is
/// built so the per-sample path never searches for keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSchema {
    pub labels: bool,
    pub time_points: bool,
    pub for_pattern_mask: bool,
    pub cut_length: bool,
}

impl SourceSchema {
    /// Resolves a schema from the keys present in a container. `X` is mandatory.
    pub fn from_keys<'a, I>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut has_x = false;
        let mut schema = SourceSchema::default();

        for key in keys {
            match key {
                KEY_X => has_x = true,
                KEY_Y => schema.labels = true,
                KEY_TIME_POINTS => schema.time_points = true,
                KEY_FOR_PATTERN_MASK => schema.for_pattern_mask = true,
                KEY_CUT_LENGTH => schema.cut_length = true,
                _ => {}
            }
        }

        if !has_x {
            return Err(DatasetError::missing(KEY_X));
        }
        Ok(schema)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = vec![KEY_X];
        if self.labels {
            keys.push(KEY_Y);
        }
        if self.time_points {
            keys.push(KEY_TIME_POINTS);
        }
        if self.for_pattern_mask {
            keys.push(KEY_FOR_PATTERN_MASK);
        }
        if self.cut_length {
            keys.push(KEY_CUT_LENGTH);
        }
        keys
    }
}

/// One sample as it sits in storage. Optional fields are `Some` exactly when the
/// source schema declares them.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub x: SeriesArray,
    pub label: Option<i64>,
    pub time_points: Option<Vec<f32>>,
    pub for_pattern_mask: Option<SeriesArray>,
    pub cut_length: Option<Vec<i64>>,
}

/// A base dataset: something that can hand out raw samples by index.
pub trait SeriesSource: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn n_steps(&self) -> usize;

    fn n_features(&self) -> usize;

    fn schema(&self) -> SourceSchema;

    fn storage_mode(&self) -> StorageMode;

    /// Loads sample `index`. The label is only read when `with_label` is set.
    fn fetch_record(&self, index: usize, with_label: bool) -> Result<RawRecord>;
}

/// Casts a stored number to an integer, refusing fractional or non-finite values.
pub(crate) fn to_integer(field: &'static str, value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(DatasetError::InvalidValue {
            field,
            reason: format!("expected an integer, got {value}"),
        });
    }
    // 2^63 itself does not fit, so the upper bound is exclusive
    if !(i64::MIN as f64..i64::MAX as f64).contains(&value) {
        return Err(DatasetError::InvalidValue {
            field,
            reason: format!("{value} does not fit in a 64-bit integer"),
        });
    }
    Ok(value as i64)
}

/// Like [`to_integer`], but also refuses negative values.
pub(crate) fn to_count(field: &'static str, value: f64) -> Result<i64> {
    let count = to_integer(field, value)?;
    if count < 0 {
        return Err(DatasetError::InvalidValue {
            field,
            reason: format!("expected a non-negative count, got {count}"),
        });
    }
    Ok(count)
}

pub(crate) fn check_time_points(points: &[f32], n_steps: usize) -> Result<()> {
    if points.len() != n_steps {
        return Err(DatasetError::ShapeMismatch {
            field: KEY_TIME_POINTS,
            expected: vec![n_steps],
            got: vec![points.len()],
        });
    }
    Ok(())
}
