#![warn(clippy::pedantic)]
#![allow(
    clippy::too_many_arguments,
    clippy::similar_names,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::default_trait_access,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::too_many_lines,
    clippy::type_complexity
)]

//! Blithe Training - task facades and trainer dispatch
//!
//! This crate provides:
//! - `TextGenerator`, `TextToText`, `TextClassifier`, `WordPredictor` -
//!   per-task facades with a uniform train/eval/test/save/push surface
//! - Capability traits the underlying models implement, one per task
//! - Trainer/evaluator dispatch translating argument schemas into the
//!   underlying training configuration
//! - Backend aliases and accelerator detection

pub mod classification;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod generation;
pub mod hub;
pub mod metrics;
pub mod model;
pub mod text_to_text;
pub mod word_prediction;

pub use classification::{ClassificationResult, TextClassifier};
pub use device::{Accelerator, GpuBackend, TrainingBackend};
pub use dispatch::{EvalResult, evaluate, fit, validate_eval_args, validate_train_args};
pub use error::TrainError;
pub use generation::{GenerationResult, TextGenerator};
pub use hub::{HubClient, HubError};
pub use model::{CausalLm, MaskedLm, Seq2SeqLm, SequenceClassifier};
pub use text_to_text::{TextToText, TextToTextResult};
pub use word_prediction::{WordPredictionResult, WordPredictor};
