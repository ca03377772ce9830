use std::path::Path;
use std::sync::Mutex;

use burn::config::Config;
use burn::data::dataset::Dataset;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, trace, warn};

use super::csdiitem::CsdiItem;
use super::file::LazySeriesFile;
use super::mcar::mcar;
use super::memory::SeriesData;
use super::source::{SeriesSource, SourceSchema, StorageMode};
use crate::error::{DatasetError, Result as DsResult};

/// Which mask is handed to the model as `gt_mask`. The same choice applies to
/// every storage mode.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum GroundTruthMask {
    /// Positions still observed after synthetic masking.
    Observed,
    /// Positions hidden by synthetic masking.
    Indicating,
}

#[derive(Config, Debug)]
pub struct CsdiDatasetConfig {
    #[config(default = true)]
    return_labels: bool,

    /// Fraction of observed values hidden per sample, in `[0, 1)`.
    #[config(default = 0.1)]
    rate: f64,

    #[config(default = "None")]
    seed: Option<u64>,

    #[config(default = "GroundTruthMask::Observed")]
    gt_mask: GroundTruthMask,
}

impl CsdiDatasetConfig {
    pub fn init<S: SeriesSource + 'static>(&self, source: S) -> DsResult<CsdiDataset> {
        if !(0.0..1.0).contains(&self.rate) {
            return Err(DatasetError::InvalidRate(self.rate));
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let schema = source.schema();
        info!(
            "CSDI dataset ({}): {} samples of [{}, {}], keys {:?}, rate {}",
            source.storage_mode(),
            source.len(),
            source.n_steps(),
            source.n_features(),
            schema.keys(),
            self.rate
        );

        Ok(CsdiDataset {
            source: Box::new(source),
            schema,
            return_labels: self.return_labels,
            rate: self.rate,
            gt_mask: self.gt_mask.clone(),
            rng: Mutex::new(rng),
        })
    }

    pub fn init_memory(&self, data: SeriesData) -> DsResult<CsdiDataset> {
        self.init(data)
    }

    /// Builds a dataset over a series file. Only the header is read here.
    pub fn init_file<P: AsRef<Path>>(&self, path: P) -> DsResult<CsdiDataset> {
        self.init(LazySeriesFile::open(path)?)
    }
}

/// Applies fresh MCAR masking to every sample it hands out and assembles the
/// CSDI training fields around it.
///
/// Safe to share between threads. Masking draws from one mutex-guarded RNG, and
/// a file-backed source reads through one mutex-guarded handle.
pub struct CsdiDataset {
    source: Box<dyn SeriesSource>,
    schema: SourceSchema,
    return_labels: bool,
    rate: f64,
    gt_mask: GroundTruthMask,
    rng: Mutex<StdRng>,
}

impl CsdiDataset {
    pub fn fetch(&self, index: usize) -> DsResult<CsdiItem> {
        let len = self.source.len();
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { index, len });
        }

        let with_label = self.schema.labels && self.return_labels;
        let raw = self.source.fetch_record(index, with_label)?;

        let masked = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| DatasetError::Poisoned("rng"))?;
            mcar(&raw.x, self.rate, &mut *rng)?
        };

        // disjoint masks, so the sum stays binary
        let observed_mask = masked.missing_mask.add(&masked.indicating_mask)?;
        let gt_mask = match self.gt_mask {
            GroundTruthMask::Observed => masked.missing_mask,
            GroundTruthMask::Indicating => masked.indicating_mask,
        };

        let n_steps = self.source.n_steps();
        let time_points = raw
            .time_points
            .unwrap_or_else(|| (0..n_steps).map(|t| t as f32).collect());
        let for_pattern_mask = raw.for_pattern_mask.unwrap_or_else(|| gt_mask.clone());
        let cut_length = raw.cut_length.unwrap_or_else(|| vec![0; n_steps]);

        trace!("Assembled sample {}", index);

        Ok(CsdiItem {
            index,
            observed_data: masked.intact,
            observed_mask,
            time_points,
            gt_mask,
            for_pattern_mask,
            cut_length,
            label: raw.label,
        })
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn n_steps(&self) -> usize {
        self.source.n_steps()
    }

    pub fn n_features(&self) -> usize {
        self.source.n_features()
    }

    pub fn schema(&self) -> SourceSchema {
        self.schema
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.source.storage_mode()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Dataset<CsdiItem> for CsdiDataset {
    fn get(&self, index: usize) -> Option<CsdiItem> {
        match self.fetch(index) {
            Ok(item) => Some(item),
            Err(DatasetError::IndexOutOfRange { .. }) => None,
            Err(err) => {
                warn!("Dropping sample {}: {}", index, err);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.source.len()
    }
}
