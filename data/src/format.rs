//! File-type resolution.
//!
//! Maps a dataset path's extension to a canonical format name before any
//! loading occurs, so that a wrong file shape fails fast.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Canonical dataset format a file extension resolves to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Plain text, one example per line.
    Text,
    /// Comma-separated values with a header row.
    Csv,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FileFormat {
    /// Resolve a path's extension to a canonical format.
    pub fn resolve(path: &Path) -> Result<Self, DataError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("txt") => Ok(Self::Text),
            Some("csv") => Ok(Self::Csv),
            _ => Err(DataError::UnsupportedFileType(path.to_path_buf())),
        }
    }

    /// Resolve a path and check the result against the formats the calling
    /// task accepts.
    pub fn resolve_for(path: &Path, supported: &[FileFormat]) -> Result<Self, DataError> {
        let format = Self::resolve(path)?;
        if !supported.contains(&format) {
            return Err(DataError::UnsupportedFileType(path.to_path_buf()));
        }
        Ok(format)
    }

    /// Resolve a train/eval path pair. Both must resolve to the same
    /// canonical format.
    pub fn resolve_pair(
        train_path: &Path,
        eval_path: &Path,
        supported: &[FileFormat],
    ) -> Result<Self, DataError> {
        let train = Self::resolve_for(train_path, supported)?;
        let eval = Self::resolve_for(eval_path, supported)?;
        if train != eval {
            return Err(DataError::FileTypeMismatch { train, eval });
        }
        Ok(train)
    }
}
