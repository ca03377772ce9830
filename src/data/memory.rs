use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::series::SeriesArray;
use super::source::{
    check_time_points, to_count, to_integer, RawRecord, SeriesSource, SourceSchema, StorageMode,
    KEY_CUT_LENGTH, KEY_FOR_PATTERN_MASK, KEY_TIME_POINTS, KEY_X, KEY_Y,
};
use crate::error::{DatasetError, Result};

/// A fully loaded collection of time series plus whatever auxiliary arrays came
/// with it. Every sample shares one `[n_steps, n_features]` shape.
#[derive(Debug, Clone)]
pub struct SeriesData {
    x: Vec<SeriesArray>,
    y: Option<Vec<i64>>,
    time_points: Option<Vec<Vec<f32>>>,
    for_pattern_mask: Option<Vec<SeriesArray>>,
    cut_length: Option<Vec<Vec<i64>>>,
    n_steps: usize,
    n_features: usize,
}

/// JSON layout accepted by [`SeriesData::from_json_file`]. `null` marks a missing value in `X`.
#[derive(Deserialize, Debug)]
struct SeriesDocument {
    #[serde(rename = "X")]
    x: Option<Vec<Vec<Vec<Option<f32>>>>>,
    y: Option<Vec<f64>>,
    time_points: Option<Vec<Vec<f32>>>,
    for_pattern_mask: Option<Vec<Vec<Vec<f32>>>>,
    cut_length: Option<Vec<Vec<f64>>>,
}

fn check_count(field: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(DatasetError::ShapeMismatch {
            field,
            expected: vec![expected],
            got: vec![got],
        });
    }
    Ok(())
}

impl SeriesData {
    pub fn new(x: Vec<SeriesArray>) -> Result<Self> {
        let [n_steps, n_features] = x.first().map(|s| s.shape()).unwrap_or([0, 0]);
        for sample in &x {
            sample.expect_shape(KEY_X, n_steps, n_features)?;
        }

        Ok(Self {
            x,
            y: None,
            time_points: None,
            for_pattern_mask: None,
            cut_length: None,
            n_steps,
            n_features,
        })
    }

    pub fn with_labels(mut self, y: Vec<i64>) -> Result<Self> {
        check_count(KEY_Y, self.x.len(), y.len())?;
        self.y = Some(y);
        Ok(self)
    }

    pub fn with_time_points(mut self, time_points: Vec<Vec<f32>>) -> Result<Self> {
        check_count(KEY_TIME_POINTS, self.x.len(), time_points.len())?;
        for points in &time_points {
            check_time_points(points, self.n_steps)?;
        }
        self.time_points = Some(time_points);
        Ok(self)
    }

    pub fn with_pattern_mask(mut self, masks: Vec<SeriesArray>) -> Result<Self> {
        check_count(KEY_FOR_PATTERN_MASK, self.x.len(), masks.len())?;
        for mask in &masks {
            mask.expect_shape(KEY_FOR_PATTERN_MASK, self.n_steps, self.n_features)?;
        }
        self.for_pattern_mask = Some(masks);
        Ok(self)
    }

    pub fn with_cut_length(mut self, cut_length: Vec<Vec<i64>>) -> Result<Self> {
        check_count(KEY_CUT_LENGTH, self.x.len(), cut_length.len())?;
        if let Some(bad) = cut_length.iter().flatten().find(|c| **c < 0) {
            return Err(DatasetError::InvalidValue {
                field: KEY_CUT_LENGTH,
                reason: format!("expected a non-negative count, got {bad}"),
            });
        }
        self.cut_length = Some(cut_length);
        Ok(self)
    }

    /// Loads a whole JSON document into memory.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading series data from {:?}", path);

        let reader = BufReader::new(File::open(path)?);
        let document: SeriesDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    fn from_document(document: SeriesDocument) -> Result<Self> {
        let x = document
            .x
            .ok_or_else(|| DatasetError::missing(KEY_X))?
            .into_iter()
            .map(|rows| SeriesArray::from_nullable_rows(KEY_X, rows))
            .collect::<Result<Vec<_>>>()?;

        let mut data = SeriesData::new(x)?;

        if let Some(y) = document.y {
            let y = y
                .into_iter()
                .map(|v| to_integer(KEY_Y, v))
                .collect::<Result<Vec<_>>>()?;
            data = data.with_labels(y)?;
        }
        if let Some(time_points) = document.time_points {
            data = data.with_time_points(time_points)?;
        }
        if let Some(masks) = document.for_pattern_mask {
            let masks = masks
                .into_iter()
                .map(|rows| SeriesArray::from_rows(KEY_FOR_PATTERN_MASK, rows))
                .collect::<Result<Vec<_>>>()?;
            data = data.with_pattern_mask(masks)?;
        }
        if let Some(cut_length) = document.cut_length {
            let cut_length = cut_length
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| to_count(KEY_CUT_LENGTH, v))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            data = data.with_cut_length(cut_length)?;
        }

        Ok(data)
    }

    pub fn x(&self) -> &[SeriesArray] {
        &self.x
    }

    pub fn labels(&self) -> Option<&[i64]> {
        self.y.as_deref()
    }

    pub(crate) fn record(&self, index: usize, with_label: bool) -> Result<RawRecord> {
        let x = self
            .x
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.x.len(),
            })?
            .clone();

        let label = if with_label {
            self.y.as_ref().map(|y| y[index])
        } else {
            None
        };

        Ok(RawRecord {
            x,
            label,
            time_points: self.time_points.as_ref().map(|t| t[index].clone()),
            for_pattern_mask: self.for_pattern_mask.as_ref().map(|m| m[index].clone()),
            cut_length: self.cut_length.as_ref().map(|c| c[index].clone()),
        })
    }
}

impl SeriesSource for SeriesData {
    fn len(&self) -> usize {
        self.x.len()
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn schema(&self) -> SourceSchema {
        SourceSchema {
            labels: self.y.is_some(),
            time_points: self.time_points.is_some(),
            for_pattern_mask: self.for_pattern_mask.is_some(),
            cut_length: self.cut_length.is_some(),
        }
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::InMemory
    }

    fn fetch_record(&self, index: usize, with_label: bool) -> Result<RawRecord> {
        self.record(index, with_label)
    }
}
