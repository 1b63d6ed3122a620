//! Raw record loading from text and CSV sources.
//!
//! Records are transient: produced here, consumed by a task encoder, and
//! discarded once tokenized.

use std::path::Path;

use crate::error::DataError;

/// A single free-text example.
#[derive(Clone, Debug)]
pub struct TextRecord {
    pub text: String,
}

/// A source/target text pair for sequence-to-sequence training.
#[derive(Clone, Debug)]
pub struct PairRecord {
    pub input: String,
    pub target: String,
}

/// A labeled example for sequence classification, optionally a sentence pair.
#[derive(Clone, Debug)]
pub struct LabeledRecord {
    pub text_a: String,
    pub text_b: Option<String>,
    pub label: i64,
}

/// Load one record per non-empty line.
pub fn load_text(path: &Path) -> Result<Vec<TextRecord>, DataError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<TextRecord> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| TextRecord {
            text: line.to_string(),
        })
        .collect();

    if records.is_empty() {
        return Err(DataError::EmptyDataset(path.to_path_buf()));
    }
    Ok(records)
}

fn column_index(
    headers: &csv::StringRecord,
    column: &'static str,
    path: &Path,
) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or(DataError::MissingColumn {
            column,
            path: path.to_path_buf(),
        })
}

/// Load `input`,`target` rows from a CSV file with a header row.
pub fn load_pairs(path: &Path) -> Result<Vec<PairRecord>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let input_idx = column_index(&headers, "input", path)?;
    let target_idx = column_index(&headers, "target", path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(PairRecord {
            input: row.get(input_idx).unwrap_or_default().to_string(),
            target: row.get(target_idx).unwrap_or_default().to_string(),
        });
    }

    if records.is_empty() {
        return Err(DataError::EmptyDataset(path.to_path_buf()));
    }
    Ok(records)
}

/// Load labeled rows from a CSV file with a header row.
///
/// Accepts either `text`,`label` columns or `text_a`,`text_b`,`label` for
/// pair tasks.
pub fn load_labeled(path: &Path) -> Result<Vec<LabeledRecord>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let label_idx = column_index(&headers, "label", path)?;

    let single_idx = headers.iter().position(|h| h == "text");
    let pair_idx = match single_idx {
        Some(_) => None,
        None => Some((
            column_index(&headers, "text_a", path)?,
            column_index(&headers, "text_b", path)?,
        )),
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let label: i64 = row
            .get(label_idx)
            .unwrap_or_default()
            .trim()
            .parse()
            .map_err(|_| DataError::MissingColumn {
                column: "label",
                path: path.to_path_buf(),
            })?;

        let record = match (single_idx, pair_idx) {
            (Some(text_idx), _) => LabeledRecord {
                text_a: row.get(text_idx).unwrap_or_default().to_string(),
                text_b: None,
                label,
            },
            (None, Some((a_idx, b_idx))) => LabeledRecord {
                text_a: row.get(a_idx).unwrap_or_default().to_string(),
                text_b: Some(row.get(b_idx).unwrap_or_default().to_string()),
                label,
            },
            (None, None) => unreachable!(),
        };
        records.push(record);
    }

    if records.is_empty() {
        return Err(DataError::EmptyDataset(path.to_path_buf()));
    }
    Ok(records)
}

/// Load just the `text` column of a CSV file, for batch inference.
pub fn load_text_column(path: &Path) -> Result<Vec<TextRecord>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let text_idx = column_index(&headers, "text", path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(TextRecord {
            text: row.get(text_idx).unwrap_or_default().to_string(),
        });
    }

    if records.is_empty() {
        return Err(DataError::EmptyDataset(path.to_path_buf()));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_text_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "train.txt", "first line\n\n  \nsecond line\n");
        let records = load_text(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "first line");
        assert_eq!(records[1].text, "second line");
    }

    #[test]
    fn test_load_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "pairs.csv",
            "input,target\nhello,bonjour\n\"a, b\",c\n",
        );
        let records = load_pairs(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, "bonjour");
        assert_eq!(records[1].input, "a, b");
    }

    #[test]
    fn test_load_pairs_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "pairs.csv", "input,output\na,b\n");
        assert!(matches!(
            load_pairs(&path),
            Err(DataError::MissingColumn {
                column: "target",
                ..
            })
        ));
    }

    #[test]
    fn test_load_labeled_single_and_pair() {
        let dir = tempfile::tempdir().unwrap();
        let single = write_file(&dir, "single.csv", "text,label\ngood,1\nbad,0\n");
        let records = load_labeled(&single).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, 1);
        assert!(records[0].text_b.is_none());

        let pair = write_file(&dir, "pair.csv", "text_a,text_b,label\nx,y,0\n");
        let records = load_labeled(&pair).unwrap();
        assert_eq!(records[0].text_b.as_deref(), Some("y"));
    }

    #[test]
    fn test_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.txt", "\n\n");
        assert!(matches!(
            load_text(&path),
            Err(DataError::EmptyDataset(_))
        ));
    }
}
