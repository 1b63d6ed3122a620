//! On-disk cache of preprocessed (tokenized) partitions.
//!
//! A cache is a directory holding one JSON file per named partition
//! (`train.json`, `eval.json`), each wrapped in a versioned envelope. When a
//! load is requested the cache is authoritative: partitions are returned as
//! stored, without re-validation against the active task, tokenizer or
//! length configuration.

use std::path::{Path, PathBuf};

use blithe_config::Task;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub const CACHE_VERSION: u32 = 1;

pub const TRAIN_PARTITION: &str = "train";
pub const EVAL_PARTITION: &str = "eval";

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    task: Task,
    examples: Vec<T>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    task: Task,
    examples: &'a [T],
}

/// Summary of a cache directory, for inspection tooling.
#[derive(Debug)]
pub struct CacheSummary {
    pub version: u32,
    pub task: Task,
    pub partitions: Vec<(String, usize)>,
}

/// Reject configured paths that look like a single file rather than a
/// directory. Preprocessed data was a single JSON file before 0.3.
pub fn ensure_directory_path(path: &Path) -> Result<(), DataError> {
    if path.extension().is_some() {
        return Err(DataError::InvalidCachePath(path.to_path_buf()));
    }
    Ok(())
}

/// Default cache directory for a task when no explicit path is configured.
#[must_use]
pub fn default_cache_dir(task: Task) -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
    base.join("blithe").join(task.to_string())
}

fn partition_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

/// Persist one named partition into the cache directory.
pub fn save_partition<T: Serialize>(
    dir: &Path,
    task: Task,
    name: &str,
    examples: &[T],
) -> Result<(), DataError> {
    ensure_directory_path(dir)?;
    std::fs::create_dir_all(dir)?;

    let envelope = EnvelopeRef {
        version: CACHE_VERSION,
        task,
        examples,
    };
    let file = std::fs::File::create(partition_file(dir, name))?;
    serde_json::to_writer(std::io::BufWriter::new(file), &envelope)?;

    tracing::info!(
        "saved {} preprocessed examples to {}",
        examples.len(),
        partition_file(dir, name).display()
    );
    Ok(())
}

/// Persist a train/eval pair into the cache directory.
pub fn save_pair<T: Serialize>(
    dir: &Path,
    task: Task,
    train: &[T],
    eval: &[T],
) -> Result<(), DataError> {
    save_partition(dir, task, TRAIN_PARTITION, train)?;
    save_partition(dir, task, EVAL_PARTITION, eval)
}

/// Load one named partition from the cache directory.
pub fn load_partition<T: DeserializeOwned>(
    dir: &Path,
    name: &'static str,
) -> Result<Vec<T>, DataError> {
    let path = partition_file(dir, name);
    if !path.exists() {
        return Err(DataError::MissingPartition {
            dir: dir.to_path_buf(),
            name,
        });
    }

    let file = std::fs::File::open(&path)?;
    let envelope: Envelope<T> = serde_json::from_reader(std::io::BufReader::new(file))?;
    if envelope.version != CACHE_VERSION {
        return Err(DataError::CacheVersion {
            found: envelope.version,
            expected: CACHE_VERSION,
        });
    }

    tracing::info!(
        "loaded {} preprocessed examples from {}",
        envelope.examples.len(),
        path.display()
    );
    Ok(envelope.examples)
}

/// Read partition metadata without materializing typed examples.
pub fn inspect(dir: &Path) -> Result<CacheSummary, DataError> {
    let mut version = None;
    let mut task = None;
    let mut partitions = Vec::new();

    for name in [TRAIN_PARTITION, EVAL_PARTITION] {
        let path = partition_file(dir, name);
        if !path.exists() {
            continue;
        }
        let file = std::fs::File::open(&path)?;
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_reader(std::io::BufReader::new(file))?;
        version.get_or_insert(envelope.version);
        task.get_or_insert(envelope.task);
        partitions.push((name.to_string(), envelope.examples.len()));
    }

    if partitions.is_empty() {
        return Err(DataError::MissingPartition {
            dir: dir.to_path_buf(),
            name: TRAIN_PARTITION,
        });
    }

    Ok(CacheSummary {
        version: version.unwrap_or(CACHE_VERSION),
        task: task.unwrap_or_default(),
        partitions,
    })
}
