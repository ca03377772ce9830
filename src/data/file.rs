use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::memory::SeriesData;
use super::series::SeriesArray;
use super::source::{
    check_time_points, to_count, to_integer, RawRecord, SeriesSource, SourceSchema, StorageMode,
    KEY_CUT_LENGTH, KEY_FOR_PATTERN_MASK, KEY_TIME_POINTS, KEY_X, KEY_Y,
};
use crate::error::{DatasetError, Result};

/// First line of a series file.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct FileHeader {
    n_samples: usize,
    n_steps: usize,
    n_features: usize,
    keys: Vec<String>,
}

/// Every line after the header: one sample.
#[derive(Serialize, Deserialize, Debug, Default)]
struct FileRecord {
    #[serde(rename = "X")]
    x: Option<Vec<Vec<Option<f32>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_points: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    for_pattern_mask: Option<Vec<Vec<f32>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cut_length: Option<Vec<f64>>,
}

struct FileHandle {
    reader: BufReader<File>,
    offsets: Vec<u64>,
}

impl FileHandle {
    /// Opens the file and records the byte offset of every sample line.
    fn open(path: &Path, n_samples: usize) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut offsets = Vec::with_capacity(n_samples);
        let mut line = String::new();

        let mut pos = reader.read_line(&mut line)? as u64;
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            if !line.trim().is_empty() {
                offsets.push(pos);
            }
            pos += read as u64;
        }

        if offsets.len() != n_samples {
            return Err(DatasetError::ShapeMismatch {
                field: KEY_X,
                expected: vec![n_samples],
                got: vec![offsets.len()],
            });
        }

        debug!("Opened {:?}, indexed {} rows", path, offsets.len());
        Ok(Self { reader, offsets })
    }

    fn read_record(&mut self, index: usize) -> Result<FileRecord> {
        let offset = *self
            .offsets
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.offsets.len(),
            })?;

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut line = String::new();
        self.reader.read_line(&mut line)?;

        Ok(serde_json::from_str(&line)?)
    }
}

/// A series file read one sample at a time.
///
/// Only the header is read on construction. The file handle is opened on the
/// first fetch and kept until the dataset is dropped.
///
/// All fetches go through a single handle behind a mutex. A burn data loader
/// shares one dataset across its workers, so their reads are serialized. Build
/// one dataset per worker to give each its own handle.
pub struct LazySeriesFile {
    path: PathBuf,
    header: FileHeader,
    schema: SourceSchema,
    handle: OnceCell<Mutex<FileHandle>>,
}

impl LazySeriesFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut line = String::new();
        BufReader::new(File::open(&path)?).read_line(&mut line)?;
        let header: FileHeader = serde_json::from_str(&line)?;
        let schema = SourceSchema::from_keys(header.keys.iter().map(String::as_str))?;

        info!(
            "Series file {:?}: {} samples of [{}, {}]",
            path, header.n_samples, header.n_steps, header.n_features
        );

        Ok(Self {
            path,
            header,
            schema,
            handle: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file handle has been opened yet.
    pub fn is_open(&self) -> bool {
        self.handle.get().is_some()
    }

    fn handle(&self) -> Result<&Mutex<FileHandle>> {
        self.handle
            .get_or_try_init(|| FileHandle::open(&self.path, self.header.n_samples).map(Mutex::new))
    }

    fn decode(&self, record: FileRecord, with_label: bool) -> Result<RawRecord> {
        let n_steps = self.header.n_steps;
        let n_features = self.header.n_features;

        let rows = record.x.ok_or_else(|| DatasetError::missing(KEY_X))?;
        let x = SeriesArray::from_nullable_rows(KEY_X, rows)?;
        x.expect_shape(KEY_X, n_steps, n_features)?;

        let label = if with_label && self.schema.labels {
            let y = record.y.ok_or_else(|| DatasetError::missing(KEY_Y))?;
            Some(to_integer(KEY_Y, y)?)
        } else {
            None
        };

        let time_points = if self.schema.time_points {
            let points = record
                .time_points
                .ok_or_else(|| DatasetError::missing(KEY_TIME_POINTS))?;
            check_time_points(&points, n_steps)?;
            Some(points)
        } else {
            None
        };

        let for_pattern_mask = if self.schema.for_pattern_mask {
            let rows = record
                .for_pattern_mask
                .ok_or_else(|| DatasetError::missing(KEY_FOR_PATTERN_MASK))?;
            let mask = SeriesArray::from_rows(KEY_FOR_PATTERN_MASK, rows)?;
            mask.expect_shape(KEY_FOR_PATTERN_MASK, n_steps, n_features)?;
            Some(mask)
        } else {
            None
        };

        let cut_length = if self.schema.cut_length {
            let values = record
                .cut_length
                .ok_or_else(|| DatasetError::missing(KEY_CUT_LENGTH))?;
            Some(
                values
                    .into_iter()
                    .map(|v| to_count(KEY_CUT_LENGTH, v))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        Ok(RawRecord {
            x,
            label,
            time_points,
            for_pattern_mask,
            cut_length,
        })
    }
}

impl SeriesSource for LazySeriesFile {
    fn len(&self) -> usize {
        self.header.n_samples
    }

    fn n_steps(&self) -> usize {
        self.header.n_steps
    }

    fn n_features(&self) -> usize {
        self.header.n_features
    }

    fn schema(&self) -> SourceSchema {
        self.schema
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::LazyFile
    }

    fn fetch_record(&self, index: usize, with_label: bool) -> Result<RawRecord> {
        if index >= self.header.n_samples {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.header.n_samples,
            });
        }

        let record = self
            .handle()?
            .lock()
            .map_err(|_| DatasetError::Poisoned("file handle"))?
            .read_record(index)?;

        self.decode(record, with_label)
    }
}

/// Writes `data` in the line-per-sample layout [`LazySeriesFile`] reads.
pub fn write_series_file<P: AsRef<Path>>(path: P, data: &SeriesData) -> Result<()> {
    let schema = data.schema();
    let header = FileHeader {
        n_samples: data.len(),
        n_steps: data.n_steps(),
        n_features: data.n_features(),
        keys: schema.keys().into_iter().map(String::from).collect(),
    };

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(&mut writer, &header)?;
    writer.write_all(b"\n")?;

    for index in 0..data.len() {
        let raw = data.record(index, true)?;
        let record = FileRecord {
            x: Some(raw.x.to_nullable_rows()),
            y: raw.label.map(|y| y as f64),
            time_points: raw.time_points,
            for_pattern_mask: raw
                .for_pattern_mask
                .map(|m| m.rows().map(|r| r.to_vec()).collect()),
            cut_length: raw
                .cut_length
                .map(|c| c.into_iter().map(|v| v as f64).collect()),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    info!("Wrote {} samples to {:?}", data.len(), path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_data() -> SeriesData {
        let x = vec![
            SeriesArray::from_nullable_rows(
                KEY_X,
                vec![vec![Some(1.0), None], vec![Some(3.0), Some(4.0)]],
            )
            .unwrap(),
            SeriesArray::from_nullable_rows(
                KEY_X,
                vec![vec![None, Some(6.0)], vec![Some(7.0), Some(8.0)]],
            )
            .unwrap(),
        ];
        SeriesData::new(x)
            .unwrap()
            .with_labels(vec![1, 0])
            .unwrap()
            .with_time_points(vec![vec![0.0, 2.0], vec![1.0, 3.0]])
            .unwrap()
    }

    #[test]
    fn open_reads_only_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.jsonl");
        write_series_file(&path, &sample_data()).unwrap();

        let file = LazySeriesFile::open(&path).unwrap();
        assert!(!file.is_open());
        assert_eq!(file.len(), 2);
        assert_eq!(file.n_steps(), 2);
        assert_eq!(file.n_features(), 2);
        assert!(file.schema().labels);
        assert!(file.schema().time_points);
        assert!(!file.schema().cut_length);

        file.fetch_record(0, true).unwrap();
        assert!(file.is_open());
    }

    #[test]
    fn records_match_in_memory_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.jsonl");
        let data = sample_data();
        write_series_file(&path, &data).unwrap();

        let file = LazySeriesFile::open(&path).unwrap();
        for index in [1, 0, 1] {
            let from_file = file.fetch_record(index, true).unwrap();
            let from_memory = data.fetch_record(index, true).unwrap();

            assert_eq!(from_file.x.to_nullable_rows(), from_memory.x.to_nullable_rows());
            assert_eq!(from_file.label, from_memory.label);
            assert_eq!(from_file.time_points, from_memory.time_points);
            assert_eq!(from_file.cut_length, None);
        }
    }

    #[test]
    fn out_of_range_does_not_open_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.jsonl");
        write_series_file(&path, &sample_data()).unwrap();

        let file = LazySeriesFile::open(&path).unwrap();
        let err = file.fetch_record(2, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(!file.is_open());
    }

    #[test]
    fn header_without_x_is_a_schema_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"n_samples":0,"n_steps":2,"n_features":1,"keys":["y"]}}"#).unwrap();

        let err = LazySeriesFile::open(file.path()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn row_count_must_match_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"n_samples":2,"n_steps":1,"n_features":1,"keys":["X"]}}"#).unwrap();
        writeln!(file, r#"{{"X":[[1.0]]}}"#).unwrap();

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn record_missing_declared_field_is_a_schema_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"n_samples":1,"n_steps":1,"n_features":1,"keys":["X","cut_length"]}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"X":[[1.0]]}}"#).unwrap();

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    fn single_record_file(keys: &str, record: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"n_samples":1,"n_steps":2,"n_features":2,"keys":{keys}}}"#
        )
        .unwrap();
        writeln!(file, "{record}").unwrap();
        file
    }

    fn shape_error_field(err: DatasetError) -> &'static str {
        assert_eq!(err.kind(), ErrorKind::Type);
        match err {
            DatasetError::ShapeMismatch { field, .. } => field,
            other => panic!("expected a shape mismatch, got {other}"),
        }
    }

    #[test]
    fn time_points_longer_than_header_steps() {
        let file = single_record_file(
            r#"["X","time_points"]"#,
            r#"{"X":[[1.0,2.0],[3.0,4.0]],"time_points":[0.0,1.0,2.0]}"#,
        );

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(shape_error_field(err), KEY_TIME_POINTS);
    }

    #[test]
    fn ragged_pattern_mask() {
        let file = single_record_file(
            r#"["X","for_pattern_mask"]"#,
            r#"{"X":[[1.0,2.0],[3.0,4.0]],"for_pattern_mask":[[1.0,0.0],[1.0]]}"#,
        );

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(shape_error_field(err), KEY_FOR_PATTERN_MASK);
    }

    #[test]
    fn pattern_mask_with_wrong_width() {
        let file = single_record_file(
            r#"["X","for_pattern_mask"]"#,
            r#"{"X":[[1.0,2.0],[3.0,4.0]],"for_pattern_mask":[[1.0,0.0,1.0],[1.0,1.0,1.0]]}"#,
        );

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(shape_error_field(err), KEY_FOR_PATTERN_MASK);
    }

    #[test]
    fn x_with_wrong_steps() {
        let file = single_record_file(r#"["X"]"#, r#"{"X":[[1.0,2.0]]}"#);

        let lazy = LazySeriesFile::open(file.path()).unwrap();
        let err = lazy.fetch_record(0, false).unwrap_err();
        assert_eq!(shape_error_field(err), KEY_X);
    }

    #[test]
    fn out_of_range_label_and_negative_cut_length() {
        let file = single_record_file(r#"["X","y"]"#, r#"{"X":[[1.0,2.0],[3.0,4.0]],"y":1e30}"#);
        let lazy = LazySeriesFile::open(file.path()).unwrap();
        assert_eq!(lazy.fetch_record(0, true).unwrap_err().kind(), ErrorKind::Type);

        let file = single_record_file(
            r#"["X","cut_length"]"#,
            r#"{"X":[[1.0,2.0],[3.0,4.0]],"cut_length":[-3.0]}"#,
        );
        let lazy = LazySeriesFile::open(file.path()).unwrap();
        assert_eq!(lazy.fetch_record(0, false).unwrap_err().kind(), ErrorKind::Type);
    }
}
