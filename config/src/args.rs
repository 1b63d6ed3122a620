//! Training, evaluation and generation argument schemas.
//!
//! These are plain value objects: constructed once per invocation, immutable
//! afterwards, and validated by the components that consume them (the
//! preprocessor and the trainer dispatch), not here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ReportTarget;

/// Hyperparameters and I/O toggles for a fine-tuning run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct TrainArgs {
    #[serde(default = "default_learning_rate")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "5e-5"))]
    pub learning_rate: f64,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.0", hide = true))]
    pub weight_decay: f32,
    #[serde(default = "default_adam_beta1")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.9", hide = true))]
    pub adam_beta1: f32,
    #[serde(default = "default_adam_beta2")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.999", hide = true))]
    pub adam_beta2: f32,
    #[serde(default = "default_adam_epsilon")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1e-8", hide = true))]
    pub adam_epsilon: f32,
    #[serde(default = "default_max_grad_norm")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1.0", hide = true))]
    pub max_grad_norm: f32,
    #[serde(default = "default_num_train_epochs")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "3"))]
    pub num_train_epochs: usize,
    #[serde(default = "default_batch_size")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1"))]
    pub batch_size: usize,
    /// Gradient accumulation steps.
    #[serde(default = "default_gas")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1"))]
    pub gas: usize,
    /// Dataloader worker threads.
    #[serde(default = "default_num_workers")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "2"))]
    pub num_workers: usize,
    /// Half-precision training. Requires a GPU accelerator.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub fp16: bool,
    /// Fraction of a single input file held out for evaluation. Must be in
    /// (0, 1] when no separate evaluation file is supplied.
    #[serde(default = "default_eval_ratio")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.1"))]
    pub eval_ratio: f64,
    /// Zero disables checkpointing entirely.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0"))]
    pub save_steps: usize,
    /// Zero leaves the validation loop unreported.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0"))]
    pub eval_steps: usize,
    /// Zero disables the end-of-run summary.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0"))]
    pub logging_steps: usize,
    /// Metrics-reporting sinks. Empty means none.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long, value_delimiter = ','))]
    pub report_to: Vec<ReportTarget>,
    #[serde(default = "default_output_dir")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "./artifacts"))]
    pub output_dir: String,
    /// Maximum token length for single-sequence tasks.
    #[serde(default = "default_max_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "512"))]
    pub max_length: usize,
    /// Maximum source length for sequence-to-sequence tasks.
    #[serde(default = "default_pair_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1024"))]
    pub max_input_length: usize,
    /// Maximum target length for sequence-to-sequence tasks.
    #[serde(default = "default_pair_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1024"))]
    pub max_output_length: usize,
    /// Masking probability. Only consulted by the masked-word task.
    #[serde(default = "default_mlm_probability")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.1"))]
    pub mlm_probability: f32,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub save_preprocessed_data: bool,
    /// Directory the tokenized partitions are written to.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub save_preprocessed_data_path: Option<PathBuf>,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub load_preprocessed_data: bool,
    /// Directory a previously saved tokenized pair is read from.
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub load_preprocessed_data_path: Option<PathBuf>,
}

fn default_learning_rate() -> f64 {
    5e-5
}
fn default_adam_beta1() -> f32 {
    0.9
}
fn default_adam_beta2() -> f32 {
    0.999
}
fn default_adam_epsilon() -> f32 {
    1e-8
}
fn default_max_grad_norm() -> f32 {
    1.0
}
fn default_num_train_epochs() -> usize {
    3
}
fn default_batch_size() -> usize {
    1
}
fn default_gas() -> usize {
    1
}
fn default_num_workers() -> usize {
    2
}
fn default_eval_ratio() -> f64 {
    0.1
}
fn default_output_dir() -> String {
    "./artifacts".to_string()
}
fn default_max_length() -> usize {
    512
}
fn default_pair_length() -> usize {
    1024
}
fn default_mlm_probability() -> f32 {
    0.1
}

impl Default for TrainArgs {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            weight_decay: 0.0,
            adam_beta1: default_adam_beta1(),
            adam_beta2: default_adam_beta2(),
            adam_epsilon: default_adam_epsilon(),
            max_grad_norm: default_max_grad_norm(),
            num_train_epochs: default_num_train_epochs(),
            batch_size: default_batch_size(),
            gas: default_gas(),
            num_workers: default_num_workers(),
            fp16: false,
            eval_ratio: default_eval_ratio(),
            save_steps: 0,
            eval_steps: 0,
            logging_steps: 0,
            report_to: Vec::new(),
            output_dir: default_output_dir(),
            max_length: default_max_length(),
            max_input_length: default_pair_length(),
            max_output_length: default_pair_length(),
            mlm_probability: default_mlm_probability(),
            save_preprocessed_data: false,
            save_preprocessed_data_path: None,
            load_preprocessed_data: false,
            load_preprocessed_data_path: None,
        }
    }
}

/// Settings for a standalone evaluation run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct EvalArgs {
    #[serde(default = "default_batch_size")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1"))]
    pub batch_size: usize,
    #[serde(default = "default_num_workers")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "2"))]
    pub num_workers: usize,
    #[serde(default = "default_max_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "512"))]
    pub max_length: usize,
    #[serde(default = "default_pair_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1024"))]
    pub max_input_length: usize,
    #[serde(default = "default_pair_length")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "1024"))]
    pub max_output_length: usize,
    #[serde(default = "default_mlm_probability")]
    #[cfg_attr(feature = "clap", arg(long, default_value = "0.1"))]
    pub mlm_probability: f32,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub save_preprocessed_data: bool,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub save_preprocessed_data_path: Option<PathBuf>,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub load_preprocessed_data: bool,
    #[serde(default)]
    #[cfg_attr(feature = "clap", arg(long))]
    pub load_preprocessed_data_path: Option<PathBuf>,
}

impl Default for EvalArgs {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            num_workers: default_num_workers(),
            max_length: default_max_length(),
            max_input_length: default_pair_length(),
            max_output_length: default_pair_length(),
            mlm_probability: default_mlm_probability(),
            save_preprocessed_data: false,
            save_preprocessed_data_path: None,
            load_preprocessed_data: false,
            load_preprocessed_data_path: None,
        }
    }
}

/// Single-example generation settings, shared by the causal and
/// text-to-text facades.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Tokens generated beyond the prompt.
    pub max_new_tokens: usize,
    /// Greedy decoding when false.
    pub do_sample: bool,
    pub temperature: f32,
    pub top_k: Option<usize>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_new_tokens: 50,
            do_sample: false,
            temperature: 1.0,
            top_k: Some(50),
        }
    }
}
