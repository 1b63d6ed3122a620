//! Task encoders: raw records to tokenized examples.
//!
//! One encoder per task, behind a single capability interface. Each variant
//! fixes its own truncation and labeling policy; all of them are
//! deterministic for a fixed (record, configuration, tokenizer) triple, which
//! the preprocessed-data cache relies on.

use std::path::Path;
use std::sync::Arc;

use blithe_config::Task;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::DataError;
use crate::format::FileFormat;
use crate::records::{self, LabeledRecord, PairRecord, TextRecord};
use crate::tokenizer::TokenizerTrait;

/// Capability interface implemented once per task: load raw rows from a
/// resolved file format, and turn them into tokenized examples.
pub trait TaskEncoder: Send + Sync {
    type Raw: Clone + Send + Sync;
    type Example: Clone + Send + Sync + std::fmt::Debug + Serialize + DeserializeOwned + 'static;

    fn task(&self) -> Task;
    fn supported_formats(&self) -> &'static [FileFormat];
    fn load_raw(&self, path: &Path, format: FileFormat) -> Result<Vec<Self::Raw>, DataError>;
    fn encode(&self, rows: Vec<Self::Raw>) -> Result<Vec<Self::Example>, DataError>;
}

/// A fixed-length block of a concatenated token stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CausalExample {
    pub tokens: Vec<u32>,
}

/// A single tokenized line; masking happens at collation time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaskedExample {
    pub tokens: Vec<u32>,
}

/// Independently tokenized source and target sequences.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Seq2SeqExample {
    pub source: Vec<u32>,
    pub target: Vec<u32>,
}

/// A tokenized (possibly joined pair) sequence with its class label.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceExample {
    pub tokens: Vec<u32>,
    pub label: i64,
}

fn to_u32(ids: &[usize]) -> Vec<u32> {
    ids.iter().map(|&id| id as u32).collect()
}

/// Causal generation: every line is tokenized with a trailing EOS, the
/// results are concatenated in input order, and the stream is cut into
/// `max_length` blocks. The trailing partial block is dropped unless it is
/// the only one. Labels are the input ids themselves; the next-token shift
/// is applied by the batcher.
pub struct CausalEncoder {
    tokenizer: Arc<dyn TokenizerTrait>,
    max_length: usize,
}

impl CausalEncoder {
    pub fn new(tokenizer: Arc<dyn TokenizerTrait>, max_length: usize) -> Self {
        Self {
            tokenizer,
            max_length,
        }
    }
}

impl TaskEncoder for CausalEncoder {
    type Raw = TextRecord;
    type Example = CausalExample;

    fn task(&self) -> Task {
        Task::CausalLm
    }

    fn supported_formats(&self) -> &'static [FileFormat] {
        &[FileFormat::Text]
    }

    fn load_raw(&self, path: &Path, format: FileFormat) -> Result<Vec<TextRecord>, DataError> {
        match format {
            FileFormat::Text => records::load_text(path),
            FileFormat::Csv => Err(DataError::UnsupportedFileType(path.to_path_buf())),
        }
    }

    fn encode(&self, rows: Vec<TextRecord>) -> Result<Vec<CausalExample>, DataError> {
        let per_row: Vec<Vec<usize>> = rows
            .par_iter()
            .map(|row| {
                let mut ids = self.tokenizer.encode(&row.text, false);
                ids.push(self.tokenizer.eos_token());
                ids
            })
            .collect();

        let stream: Vec<usize> = per_row.into_iter().flatten().collect();

        if stream.len() < self.max_length {
            return Ok(vec![CausalExample {
                tokens: to_u32(&stream),
            }]);
        }

        Ok(stream
            .chunks_exact(self.max_length)
            .map(|chunk| CausalExample {
                tokens: to_u32(chunk),
            })
            .collect())
    }
}

/// Masked-word prediction: each line is tokenized and truncated to
/// `max_length`. The stochastic masking itself lives in the collator so the
/// encoder stays deterministic.
pub struct MaskedEncoder {
    tokenizer: Arc<dyn TokenizerTrait>,
    max_length: usize,
}

impl MaskedEncoder {
    pub fn new(tokenizer: Arc<dyn TokenizerTrait>, max_length: usize) -> Self {
        Self {
            tokenizer,
            max_length,
        }
    }
}

impl TaskEncoder for MaskedEncoder {
    type Raw = TextRecord;
    type Example = MaskedExample;

    fn task(&self) -> Task {
        Task::MaskedLm
    }

    fn supported_formats(&self) -> &'static [FileFormat] {
        &[FileFormat::Text]
    }

    fn load_raw(&self, path: &Path, format: FileFormat) -> Result<Vec<TextRecord>, DataError> {
        match format {
            FileFormat::Text => records::load_text(path),
            FileFormat::Csv => Err(DataError::UnsupportedFileType(path.to_path_buf())),
        }
    }

    fn encode(&self, rows: Vec<TextRecord>) -> Result<Vec<MaskedExample>, DataError> {
        Ok(rows
            .par_iter()
            .map(|row| {
                let mut ids = self.tokenizer.encode(&row.text, true);
                ids.truncate(self.max_length);
                MaskedExample {
                    tokens: to_u32(&ids),
                }
            })
            .collect())
    }
}

/// Sequence-to-sequence: source and target are tokenized independently under
/// their own length limits.
pub struct Seq2SeqEncoder {
    tokenizer: Arc<dyn TokenizerTrait>,
    max_input_length: usize,
    max_output_length: usize,
}

impl Seq2SeqEncoder {
    pub fn new(
        tokenizer: Arc<dyn TokenizerTrait>,
        max_input_length: usize,
        max_output_length: usize,
    ) -> Self {
        Self {
            tokenizer,
            max_input_length,
            max_output_length,
        }
    }
}

impl TaskEncoder for Seq2SeqEncoder {
    type Raw = PairRecord;
    type Example = Seq2SeqExample;

    fn task(&self) -> Task {
        Task::Seq2Seq
    }

    fn supported_formats(&self) -> &'static [FileFormat] {
        &[FileFormat::Csv]
    }

    fn load_raw(&self, path: &Path, format: FileFormat) -> Result<Vec<PairRecord>, DataError> {
        match format {
            FileFormat::Csv => records::load_pairs(path),
            FileFormat::Text => Err(DataError::UnsupportedFileType(path.to_path_buf())),
        }
    }

    fn encode(&self, rows: Vec<PairRecord>) -> Result<Vec<Seq2SeqExample>, DataError> {
        Ok(rows
            .par_iter()
            .map(|row| {
                let mut source = self.tokenizer.encode(&row.input, true);
                source.truncate(self.max_input_length);
                let mut target = self.tokenizer.encode(&row.target, true);
                target.truncate(self.max_output_length);
                Seq2SeqExample {
                    source: to_u32(&source),
                    target: to_u32(&target),
                }
            })
            .collect())
    }
}

/// Sequence classification: single texts are tokenized directly, pairs are
/// joined as one sequence with the tokenizer's pairing convention. A label
/// outside the configured class range fails the whole encode.
pub struct SequenceEncoder {
    tokenizer: Arc<dyn TokenizerTrait>,
    max_length: usize,
    num_labels: usize,
}

impl SequenceEncoder {
    pub fn new(tokenizer: Arc<dyn TokenizerTrait>, max_length: usize, num_labels: usize) -> Self {
        Self {
            tokenizer,
            max_length,
            num_labels,
        }
    }
}

impl TaskEncoder for SequenceEncoder {
    type Raw = LabeledRecord;
    type Example = SequenceExample;

    fn task(&self) -> Task {
        Task::SequenceClassification
    }

    fn supported_formats(&self) -> &'static [FileFormat] {
        &[FileFormat::Csv]
    }

    fn load_raw(&self, path: &Path, format: FileFormat) -> Result<Vec<LabeledRecord>, DataError> {
        match format {
            FileFormat::Csv => records::load_labeled(path),
            FileFormat::Text => Err(DataError::UnsupportedFileType(path.to_path_buf())),
        }
    }

    fn encode(&self, rows: Vec<LabeledRecord>) -> Result<Vec<SequenceExample>, DataError> {
        rows.par_iter()
            .map(|row| {
                if row.label < 0 || row.label as usize >= self.num_labels {
                    return Err(DataError::NumClassesMismatch {
                        label: row.label,
                        num_labels: self.num_labels,
                    });
                }

                let mut ids = match &row.text_b {
                    Some(text_b) => self.tokenizer.encode_pair(&row.text_a, text_b, true),
                    None => self.tokenizer.encode(&row.text_a, true),
                };
                ids.truncate(self.max_length);

                Ok(SequenceExample {
                    tokens: to_u32(&ids),
                    label: row.label,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{EOS, SEP, WordTokenizer};

    fn tokenizer() -> Arc<dyn TokenizerTrait> {
        Arc::new(WordTokenizer::new(&[
            "the", "cat", "sat", "on", "a", "mat", "dog", "ran",
        ]))
    }

    fn text_rows(lines: &[&str]) -> Vec<TextRecord> {
        lines
            .iter()
            .map(|line| TextRecord {
                text: (*line).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_causal_concatenates_and_chunks() {
        let encoder = CausalEncoder::new(tokenizer(), 4);
        // 3 + 1 eos + 2 + 1 eos = 8 tokens -> two exact chunks
        let examples = encoder
            .encode(text_rows(&["the cat sat", "dog ran"]))
            .unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].tokens.len(), 4);
        assert_eq!(examples[0].tokens[3], EOS as u32);
        assert_eq!(examples[1].tokens[3], EOS as u32);
    }

    #[test]
    fn test_causal_drops_trailing_remainder() {
        let encoder = CausalEncoder::new(tokenizer(), 4);
        // 6 tokens with eos -> one chunk, remainder of 2 dropped
        let examples = encoder
            .encode(text_rows(&["the cat sat on a"]))
            .unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].tokens.len(), 4);
    }

    #[test]
    fn test_causal_keeps_single_short_block() {
        let encoder = CausalEncoder::new(tokenizer(), 128);
        let examples = encoder.encode(text_rows(&["the cat"])).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].tokens.len(), 3);
    }

    #[test]
    fn test_causal_is_deterministic() {
        let encoder = CausalEncoder::new(tokenizer(), 4);
        let rows = text_rows(&["the cat sat", "dog ran", "a mat"]);
        let first = encoder.encode(rows.clone()).unwrap();
        let second = encoder.encode(rows).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.tokens, b.tokens);
        }
    }

    #[test]
    fn test_masked_roundtrip_up_to_truncation() {
        let tok = tokenizer();
        let encoder = MaskedEncoder::new(tok.clone(), 3);
        let examples = encoder
            .encode(text_rows(&["the cat sat on a mat"]))
            .unwrap();
        assert_eq!(examples[0].tokens.len(), 3);

        let ids: Vec<usize> = examples[0].tokens.iter().map(|&t| t as usize).collect();
        assert_eq!(tok.decode(&ids, true), "the cat sat");
    }

    #[test]
    fn test_seq2seq_independent_limits() {
        let encoder = Seq2SeqEncoder::new(tokenizer(), 2, 4);
        let examples = encoder
            .encode(vec![PairRecord {
                input: "the cat sat".to_string(),
                target: "dog ran on a mat".to_string(),
            }])
            .unwrap();
        assert_eq!(examples[0].source.len(), 2);
        assert_eq!(examples[0].target.len(), 4);
    }

    #[test]
    fn test_sequence_pair_joins_with_separator() {
        let encoder = SequenceEncoder::new(tokenizer(), 16, 2);
        let examples = encoder
            .encode(vec![LabeledRecord {
                text_a: "the cat".to_string(),
                text_b: Some("dog ran".to_string()),
                label: 1,
            }])
            .unwrap();
        assert!(examples[0].tokens.contains(&(SEP as u32)));
        assert_eq!(examples[0].label, 1);
    }

    #[test]
    fn test_sequence_label_out_of_range() {
        let encoder = SequenceEncoder::new(tokenizer(), 16, 2);
        let err = encoder.encode(vec![LabeledRecord {
            text_a: "the cat".to_string(),
            text_b: None,
            label: 2,
        }]);
        assert!(matches!(
            err,
            Err(DataError::NumClassesMismatch {
                label: 2,
                num_labels: 2
            })
        ));
    }
}
