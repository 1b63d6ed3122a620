//! Error taxonomy for dataset preparation.

use std::path::PathBuf;

use crate::format::FileFormat;

/// Errors raised while resolving, loading, tokenizing or caching datasets.
///
/// Validation variants are raised eagerly, before any expensive load or
/// tokenize work begins.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("unsupported file type for {0}: expected one of .txt, .csv")]
    UnsupportedFileType(PathBuf),
    #[error("train file-type ({train}) must be the same as the eval file-type ({eval})")]
    FileTypeMismatch { train: FileFormat, eval: FileFormat },
    #[error(
        "preprocessed datasets are saved as a directory as of version 0.3; \
         '{0}' looks like a single-file path"
    )]
    InvalidCachePath(PathBuf),
    #[error("preprocessed dataset has version {found}, expected {expected}; preprocess again")]
    CacheVersion { found: u32, expected: u32 },
    #[error("missing partition '{name}' in preprocessed dataset at {dir}")]
    MissingPartition { dir: PathBuf, name: &'static str },
    #[error("missing required column '{column}' in {path}")]
    MissingColumn { column: &'static str, path: PathBuf },
    #[error("label {label} is outside the configured range of {num_labels} classes")]
    NumClassesMismatch { label: i64, num_labels: usize },
    #[error("no records loaded from {0}")]
    EmptyDataset(PathBuf),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to serialize preprocessed dataset: {0}")]
    Json(#[from] serde_json::Error),
}
