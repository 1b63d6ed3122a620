//! Blithe Data - Dataset loading, tokenization and collation
//!
//! This crate provides:
//! - `FileFormat` - file-type resolution for dataset paths
//! - `Tokenizer` - HuggingFace tokenizer wrapper
//! - Task encoders - per-task raw-record to tokenized-example conversion
//! - Batchers - collation of tokenized examples into padded tensors
//! - `prepare_train` / `prepare_eval` - partition preparation with caching

pub mod batcher;
pub mod cache;
pub mod encode;
pub mod error;
pub mod format;
pub mod preprocess;
pub mod records;
pub mod test_utils;
pub mod tokenizer;

// Re-export commonly used items
pub use batcher::{
    CausalBatcher, CausalTrainingBatch, MaskedLmBatch, MaskedLmBatcher, Seq2SeqBatch,
    Seq2SeqBatcher, SequenceBatch, SequenceBatcher, mask_tokens,
};
pub use cache::CacheSummary;
pub use encode::{
    CausalEncoder, CausalExample, MaskedEncoder, MaskedExample, Seq2SeqEncoder, Seq2SeqExample,
    SequenceEncoder, SequenceExample, TaskEncoder,
};
pub use error::DataError;
pub use format::FileFormat;
pub use preprocess::{SHUFFLE_SEED, prepare_eval, prepare_train, shuffle_split};
pub use records::{LabeledRecord, PairRecord, TextRecord};
pub use tokenizer::{Tokenizer, TokenizerTrait};
