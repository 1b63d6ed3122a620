//! Dataset preparation: load, split, tokenize, cache.
//!
//! The entry points mirror the facade surface: `prepare_train` produces a
//! train/eval partition pair, `prepare_eval` a single eval partition. Both
//! honor the preprocessed-data cache, which takes precedence over explicit
//! file paths when loading is requested.

use std::path::Path;

use blithe_config::{EvalArgs, TrainArgs};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::cache;
use crate::encode::TaskEncoder;
use crate::error::DataError;
use crate::format::FileFormat;

/// Fixed shuffle seed, so the same input file always splits the same way.
pub const SHUFFLE_SEED: u64 = 42;

/// Deterministically shuffle and split rows into (train, eval). The eval
/// partition receives `round(n * eval_ratio)` rows, clamped to at least one.
pub fn shuffle_split<T>(mut rows: Vec<T>, eval_ratio: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    rows.shuffle(&mut rng);

    let eval_len =
        ((rows.len() as f64) * eval_ratio).round().clamp(1.0, rows.len() as f64) as usize;
    let train = rows.split_off(eval_len);
    (train, rows)
}

/// Prepare tokenized train/eval partitions for a fine-tuning run.
///
/// - With `load_preprocessed_data` set, the cached pair is returned as-is;
///   an explicit eval path is ignored with a warning.
/// - With no eval path, the input file is shuffled with a fixed seed and
///   split by `eval_ratio`.
/// - With an eval path, both files are loaded independently after the
///   file-type match check.
pub fn prepare_train<E: TaskEncoder>(
    encoder: &E,
    input_path: &Path,
    eval_path: Option<&Path>,
    args: &TrainArgs,
) -> Result<(Vec<E::Example>, Vec<E::Example>), DataError> {
    let (train, eval) = if args.load_preprocessed_data {
        let dir = args
            .load_preprocessed_data_path
            .clone()
            .unwrap_or_else(|| cache::default_cache_dir(encoder.task()));
        cache::ensure_directory_path(&dir)?;

        if let Some(eval_path) = eval_path {
            tracing::warn!(
                "eval data will be fetched from {} and not {}",
                dir.display(),
                eval_path.display()
            );
        }

        let train = cache::load_partition(&dir, cache::TRAIN_PARTITION)?;
        let eval = cache::load_partition(&dir, cache::EVAL_PARTITION)?;
        (train, eval)
    } else if let Some(eval_path) = eval_path {
        let format =
            FileFormat::resolve_pair(input_path, eval_path, encoder.supported_formats())?;
        let train_rows = encoder.load_raw(input_path, format)?;
        let eval_rows = encoder.load_raw(eval_path, format)?;

        tracing::info!("tokenizing training data");
        let train = encoder.encode(train_rows)?;
        tracing::info!("tokenizing eval data");
        let eval = encoder.encode(eval_rows)?;
        (train, eval)
    } else {
        let format = FileFormat::resolve_for(input_path, encoder.supported_formats())?;
        let rows = encoder.load_raw(input_path, format)?;
        tracing::info!(
            "loaded {} records from {}",
            rows.len(),
            input_path.display()
        );

        let (train_rows, eval_rows) = shuffle_split(rows, args.eval_ratio);

        tracing::info!("tokenizing training data");
        let train = encoder.encode(train_rows)?;
        tracing::info!("tokenizing eval data");
        let eval = encoder.encode(eval_rows)?;
        (train, eval)
    };

    if args.save_preprocessed_data {
        if args.load_preprocessed_data {
            tracing::warn!("both save_preprocessed_data and load_preprocessed_data are enabled");
        }
        let dir = args
            .save_preprocessed_data_path
            .clone()
            .unwrap_or_else(|| cache::default_cache_dir(encoder.task()));
        cache::save_pair(&dir, encoder.task(), &train, &eval)?;
    }

    Ok((train, eval))
}

/// Prepare a single tokenized eval partition, with the same cache policy as
/// [`prepare_train`] restricted to the eval partition.
pub fn prepare_eval<E: TaskEncoder>(
    encoder: &E,
    input_path: &Path,
    args: &EvalArgs,
) -> Result<Vec<E::Example>, DataError> {
    let eval = if args.load_preprocessed_data {
        let dir = args
            .load_preprocessed_data_path
            .clone()
            .unwrap_or_else(|| cache::default_cache_dir(encoder.task()));
        cache::ensure_directory_path(&dir)?;
        tracing::info!("loading preprocessed dataset from {}", dir.display());
        cache::load_partition(&dir, cache::EVAL_PARTITION)?
    } else {
        tracing::info!("preprocessing dataset");
        let format = FileFormat::resolve_for(input_path, encoder.supported_formats())?;
        let rows = encoder.load_raw(input_path, format)?;
        encoder.encode(rows)?
    };

    if args.save_preprocessed_data {
        if args.load_preprocessed_data {
            tracing::warn!("both save_preprocessed_data and load_preprocessed_data are enabled");
        }
        let dir = args
            .save_preprocessed_data_path
            .clone()
            .unwrap_or_else(|| cache::default_cache_dir(encoder.task()));
        tracing::info!("saving evaluating dataset to {}", dir.display());
        cache::save_partition(&dir, encoder.task(), cache::EVAL_PARTITION, &eval)?;
    }

    Ok(eval)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::encode::{CausalEncoder, CausalExample};
    use crate::test_utils::WordTokenizer;

    fn encoder(max_length: usize) -> CausalEncoder {
        CausalEncoder::new(
            Arc::new(WordTokenizer::new(&[
                "the", "cat", "sat", "on", "a", "mat", "dog", "ran",
            ])),
            max_length,
        )
    }

    #[test]
    fn test_shuffle_split_is_deterministic() {
        let rows: Vec<usize> = (0..100).collect();
        let (train_a, eval_a) = shuffle_split(rows.clone(), 0.2);
        let (train_b, eval_b) = shuffle_split(rows, 0.2);
        assert_eq!(train_a, train_b);
        assert_eq!(eval_a, eval_b);
        assert_eq!(eval_a.len(), 20);
        assert_eq!(train_a.len(), 80);
    }

    #[test]
    fn test_shuffle_split_full_eval_ratio() {
        let rows: Vec<usize> = (0..10).collect();
        let (train, eval) = shuffle_split(rows, 1.0);
        assert!(train.is_empty());
        assert_eq!(eval.len(), 10);
    }

    #[test]
    fn test_shuffle_split_keeps_at_least_one_eval_row() {
        let rows: Vec<usize> = (0..10).collect();
        let (train, eval) = shuffle_split(rows, 0.0001);
        assert_eq!(eval.len(), 1);
        assert_eq!(train.len(), 9);
    }

    #[test]
    fn test_prepare_train_single_file_split() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("train.txt");
        let lines: Vec<String> = (0..20).map(|_| "the cat sat".to_string()).collect();
        std::fs::write(&input, lines.join("\n")).unwrap();

        let args = blithe_config::TrainArgs {
            eval_ratio: 0.5,
            ..Default::default()
        };
        let (train, eval) = prepare_train(&encoder(4), &input, None, &args).unwrap();
        assert!(!train.is_empty());
        assert!(!eval.is_empty());
    }

    #[test]
    fn test_prepare_train_rejects_unsupported_eval_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("train.txt");
        let eval = dir.path().join("eval.csv");
        std::fs::write(&input, "the cat").unwrap();
        std::fs::write(&eval, "text\nthe cat\n").unwrap();

        let args = blithe_config::TrainArgs::default();
        let err = prepare_train(&encoder(4), &input, Some(&eval), &args);
        assert!(matches!(err, Err(DataError::UnsupportedFileType(_))));
    }

    #[test]
    fn test_cache_takes_precedence_over_eval_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let train = vec![CausalExample {
            tokens: vec![1, 2, 3, 4],
        }];
        let eval = vec![CausalExample {
            tokens: vec![5, 6, 7, 8],
        }];
        cache::save_pair(&cache_dir, blithe_config::Task::CausalLm, &train, &eval).unwrap();

        // The explicit eval path does not even exist; it must never be read.
        let missing_eval = dir.path().join("never-read.txt");
        let missing_input = dir.path().join("never-read-either.txt");

        let args = blithe_config::TrainArgs {
            load_preprocessed_data: true,
            load_preprocessed_data_path: Some(cache_dir),
            ..Default::default()
        };
        let (loaded_train, loaded_eval) =
            prepare_train(&encoder(4), &missing_input, Some(&missing_eval), &args).unwrap();
        assert_eq!(loaded_train[0].tokens, vec![1, 2, 3, 4]);
        assert_eq!(loaded_eval[0].tokens, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_prepare_train_saves_cache() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("train.txt");
        let lines: Vec<String> = (0..10).map(|_| "dog ran on a mat".to_string()).collect();
        std::fs::write(&input, lines.join("\n")).unwrap();
        let cache_dir = dir.path().join("preprocessed");

        let args = blithe_config::TrainArgs {
            save_preprocessed_data: true,
            save_preprocessed_data_path: Some(cache_dir.clone()),
            eval_ratio: 0.3,
            ..Default::default()
        };
        prepare_train(&encoder(4), &input, None, &args).unwrap();

        let reload_args = blithe_config::TrainArgs {
            load_preprocessed_data: true,
            load_preprocessed_data_path: Some(cache_dir),
            ..Default::default()
        };
        let (train, eval) =
            prepare_train(&encoder(4), &input, None, &reload_args).unwrap();
        assert!(!train.is_empty());
        assert!(!eval.is_empty());
    }

    #[test]
    fn test_prepare_eval_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("eval.txt");
        std::fs::write(&input, "the cat sat on a mat\ndog ran\n").unwrap();

        let args = blithe_config::EvalArgs::default();
        let eval = prepare_eval(&encoder(4), &input, &args).unwrap();
        assert!(!eval.is_empty());
    }
}
