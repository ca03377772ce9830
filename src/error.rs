/// Broad classes of [`DatasetError`], for callers that only care which layer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sample index outside `0..len`.
    Index,
    /// A required field is absent from the data source.
    Schema,
    /// The data source returned an unexpected shape or value.
    Type,
    /// The dataset was configured with invalid parameters.
    Config,
    /// Storage I/O or decoding failed.
    Io,
}

/// All errors raised while loading or assembling samples.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("required field `{0}` is absent from the data source")]
    MissingField(String),

    #[error("shape mismatch for `{field}`: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("missing rate must be in [0, 1), got {0}")]
    InvalidRate(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::IndexOutOfRange { .. } => ErrorKind::Index,
            DatasetError::MissingField(_) => ErrorKind::Schema,
            DatasetError::ShapeMismatch { .. } | DatasetError::InvalidValue { .. } => {
                ErrorKind::Type
            }
            DatasetError::InvalidRate(_) => ErrorKind::Config,
            DatasetError::Io(_) | DatasetError::Json(_) | DatasetError::Poisoned(_) => {
                ErrorKind::Io
            }
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        DatasetError::MissingField(field.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let err = DatasetError::IndexOutOfRange { index: 3, len: 3 };
        assert_eq!(err.kind(), ErrorKind::Index);
        assert_eq!(err.to_string(), "index 3 out of range for dataset of length 3");

        assert_eq!(DatasetError::missing("X").kind(), ErrorKind::Schema);
        assert_eq!(DatasetError::InvalidRate(1.0).kind(), ErrorKind::Config);

        let err = DatasetError::ShapeMismatch {
            field: "time_points",
            expected: vec![4],
            got: vec![3],
        };
        assert_eq!(err.kind(), ErrorKind::Type);
    }
}
