//! Datasets for training CSDI-style time series imputation models.
//!
//! [`CsdiDataset`] wraps an in-memory [`SeriesData`] or a lazily read
//! [`LazySeriesFile`], hides a fresh random fraction of the observed values in
//! every sample it returns ([`mcar`]), and assembles the fields a CSDI model
//! trains on. [`CsdiBatcher`] collates those samples into burn tensors.

pub mod data;
pub mod error;
pub mod utils;

pub use data::batcher::CsdiBatcher;
pub use data::batchitem::CsdiBatch;
pub use data::csdi::{CsdiDataset, CsdiDatasetConfig, GroundTruthMask};
pub use data::csdiitem::{CsdiItem, SampleField, SAMPLE_FIELDS};
pub use data::file::{write_series_file, LazySeriesFile};
pub use data::mcar::{mcar, McarOutput};
pub use data::memory::SeriesData;
pub use data::series::SeriesArray;
pub use data::source::{RawRecord, SeriesSource, SourceSchema, StorageMode};
pub use error::{DatasetError, ErrorKind, Result};
