use std::path::PathBuf;

use thiserror::Error;

/// The dataset could not be read at startup. Fatal; there is nothing to retry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("malformed parquet batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("malformed dataset: {0}")]
    Malformed(String),

    #[error("dataset {} has no rows", .0.display())]
    Empty(PathBuf),
}

/// A filter or aggregation request does not fit the loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("bucket count must be at least 1")]
    InvalidBucketCount,

    #[error("bucket count {requested} exceeds the maximum of {max}")]
    TooManyBuckets { requested: usize, max: usize },
}
