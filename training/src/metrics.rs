//! Export per-epoch training metrics to CSV.
//!
//! The trainer writes one log file per metric under
//! `{artifact_dir}/{split}/epoch-{n}/`. This module flattens those logs into
//! one CSV per split for plotting.

use std::io::Write;
use std::path::{Path, PathBuf};

const METRIC_FILES: &[(&str, &str)] = &[
    ("Loss.log", "loss"),
    ("Perplexity.log", "perplexity"),
    ("Accuracy.log", "accuracy"),
    ("LearningRate.log", "learning_rate"),
];

/// Parse a metric log file, returning one value per line. Steps are
/// 1-indexed line numbers, since the step column in log files isn't reliable.
fn parse_metric_log(path: &Path) -> Option<Vec<f64>> {
    let content = std::fs::read_to_string(path).ok()?;
    let values: Vec<f64> = content
        .lines()
        .filter_map(|line| line.split(',').next()?.parse().ok())
        .collect();

    if values.is_empty() { None } else { Some(values) }
}

/// Collect all epoch directories from a split's metrics dir.
fn collect_epochs(metrics_dir: &Path) -> Vec<(usize, PathBuf)> {
    let mut epochs = Vec::new();

    if let Ok(entries) = std::fs::read_dir(metrics_dir) {
        for entry in entries.filter_map(std::result::Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(epoch_str) = name.strip_prefix("epoch-")
                && let Ok(epoch) = epoch_str.parse::<usize>()
            {
                epochs.push((epoch, entry.path()));
            }
        }
    }

    epochs.sort_by_key(|(epoch, _)| *epoch);
    epochs
}

fn export_split(artifact_dir: &Path, split: &str) -> std::io::Result<usize> {
    let epochs = collect_epochs(&artifact_dir.join(split));
    if epochs.is_empty() {
        return Ok(0);
    }

    // Only emit columns for metrics that actually have logs.
    let present: Vec<(&str, &str)> = METRIC_FILES
        .iter()
        .copied()
        .filter(|(file, _)| epochs.iter().any(|(_, dir)| dir.join(file).exists()))
        .collect();
    if present.is_empty() {
        return Ok(0);
    }

    let output = artifact_dir.join(format!("metrics_{split}.csv"));
    let mut file = std::fs::File::create(&output)?;

    let columns: Vec<&str> = present.iter().map(|(_, column)| *column).collect();
    writeln!(file, "epoch,step,{}", columns.join(","))?;

    let mut rows = 0usize;
    for (epoch, epoch_dir) in &epochs {
        let per_metric: Vec<Option<Vec<f64>>> = present
            .iter()
            .map(|(file, _)| parse_metric_log(&epoch_dir.join(file)))
            .collect();

        let steps = per_metric
            .iter()
            .filter_map(|values| values.as_ref().map(Vec::len))
            .max()
            .unwrap_or(0);

        for step in 0..steps {
            let values: Vec<String> = per_metric
                .iter()
                .map(|values| {
                    values
                        .as_ref()
                        .and_then(|v| v.get(step))
                        .map(|v| format!("{v}"))
                        .unwrap_or_default()
                })
                .collect();
            writeln!(file, "{},{},{}", epoch, step + 1, values.join(","))?;
            rows += 1;
        }
    }

    tracing::info!("wrote {rows} metric rows to {}", output.display());
    Ok(rows)
}

/// Export the train and valid metric logs of one run to CSV files inside the
/// artifact directory.
pub fn export_run(artifact_dir: &Path) -> std::io::Result<()> {
    export_split(artifact_dir, "train")?;
    export_split(artifact_dir, "valid")?;
    Ok(())
}
