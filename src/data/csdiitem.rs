use serde::{Deserialize, Serialize};

use super::series::SeriesArray;

/// Field names in the positional order collation relies on.
pub const SAMPLE_FIELDS: [&str; 8] = [
    "index",
    "observed_data",
    "observed_mask",
    "time_points",
    "gt_mask",
    "for_pattern_mask",
    "cut_length",
    "label",
];

/// One training sample for a CSDI model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CsdiItem {
    pub index: usize,
    pub observed_data: SeriesArray,    // [T, F], values before synthetic masking
    pub observed_mask: SeriesArray,    // [T, F]
    pub time_points: Vec<f32>,         // [T]
    pub gt_mask: SeriesArray,          // [T, F]
    pub for_pattern_mask: SeriesArray, // [T, F]
    pub cut_length: Vec<i64>,
    pub label: Option<i64>,
}

/// A single positional entry of a [`CsdiItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleField {
    Index(usize),
    ObservedData(SeriesArray),
    ObservedMask(SeriesArray),
    TimePoints(Vec<f32>),
    GtMask(SeriesArray),
    ForPatternMask(SeriesArray),
    CutLength(Vec<i64>),
    Label(i64),
}

impl SampleField {
    pub fn name(&self) -> &'static str {
        match self {
            SampleField::Index(_) => SAMPLE_FIELDS[0],
            SampleField::ObservedData(_) => SAMPLE_FIELDS[1],
            SampleField::ObservedMask(_) => SAMPLE_FIELDS[2],
            SampleField::TimePoints(_) => SAMPLE_FIELDS[3],
            SampleField::GtMask(_) => SAMPLE_FIELDS[4],
            SampleField::ForPatternMask(_) => SAMPLE_FIELDS[5],
            SampleField::CutLength(_) => SAMPLE_FIELDS[6],
            SampleField::Label(_) => SAMPLE_FIELDS[7],
        }
    }
}

impl CsdiItem {
    pub fn n_steps(&self) -> usize {
        self.observed_data.n_steps()
    }

    pub fn n_features(&self) -> usize {
        self.observed_data.n_features()
    }

    /// Flattens the sample into its fixed field order: seven entries, plus the
    /// label last when there is one.
    pub fn into_fields(self) -> Vec<SampleField> {
        let mut fields = vec![
            SampleField::Index(self.index),
            SampleField::ObservedData(self.observed_data),
            SampleField::ObservedMask(self.observed_mask),
            SampleField::TimePoints(self.time_points),
            SampleField::GtMask(self.gt_mask),
            SampleField::ForPatternMask(self.for_pattern_mask),
            SampleField::CutLength(self.cut_length),
        ];

        if let Some(label) = self.label {
            fields.push(SampleField::Label(label));
        }

        fields
    }
}
