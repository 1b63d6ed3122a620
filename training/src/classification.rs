//! Sequence-classification facade.

use std::path::Path;
use std::sync::Arc;

use blithe_config::{EvalArgs, Task, TrainArgs};
use blithe_data::batcher::{SequenceBatch, SequenceBatcher};
use blithe_data::encode::SequenceEncoder;
use blithe_data::format::FileFormat;
use blithe_data::records;
use blithe_data::tokenizer::TokenizerTrait;
use blithe_data::{prepare_eval, prepare_train};
use burn::{
    module::AutodiffModule,
    prelude::*,
    record::{DefaultRecorder, Recorder},
    tensor::activation::softmax,
    tensor::backend::AutodiffBackend,
    train::{ClassificationOutput, InferenceStep, TrainStep},
};
use serde::{Deserialize, Serialize};

use crate::device::Accelerator;
use crate::dispatch::{self, EvalResult};
use crate::error::{TrainError, validate_text_input};
use crate::hub::HubClient;
use crate::model::SequenceClassifier;

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub score: f32,
}

/// Class-range configuration persisted beside the model record, so a saved
/// classifier round-trips with its label names.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ClassifierConfig {
    num_labels: usize,
    id2label: Vec<String>,
}

/// Facade for single- and pair-sequence classification over labeled CSV
/// rows. The class count is fixed at construction time; labels outside the
/// range fail preprocessing.
pub struct TextClassifier<B: AutodiffBackend, M> {
    model: M,
    tokenizer: Arc<dyn TokenizerTrait>,
    accelerator: Accelerator,
    device: B::Device,
    num_labels: usize,
    id2label: Vec<String>,
}

impl<B, M> TextClassifier<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    M::InnerModule: SequenceClassifier<B::InnerBackend>,
{
    pub fn new(
        model: M,
        tokenizer: Arc<dyn TokenizerTrait>,
        device: B::Device,
        num_labels: usize,
    ) -> Self {
        let accelerator = Accelerator::detect();
        tracing::info!("using device: {accelerator}");
        let id2label = (0..num_labels).map(|idx| format!("LABEL_{idx}")).collect();
        Self {
            model,
            tokenizer,
            accelerator,
            device,
            num_labels,
            id2label,
        }
    }

    /// Replace the default `LABEL_{i}` names with explicit class names.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self, TrainError> {
        if labels.len() != self.num_labels {
            return Err(TrainError::InvalidArgument(format!(
                "expected {} label names, got {}",
                self.num_labels,
                labels.len()
            )));
        }
        self.id2label = labels;
        Ok(self)
    }

    /// Load a previously saved classifier, restoring its label mapping.
    pub fn from_artifacts(
        dir: &Path,
        model: M,
        tokenizer: Arc<dyn TokenizerTrait>,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        let config: ClassifierConfig =
            serde_json::from_str(&std::fs::read_to_string(dir.join("config.json"))?)?;

        let record = DefaultRecorder::new().load(dir.join("model"), &device)?;
        let model = model.load_record(record);

        let facade = Self::new(model, tokenizer, device, config.num_labels);
        facade.with_labels(config.id2label)
    }

    pub fn accelerator(&self) -> Accelerator {
        self.accelerator
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Fine-tune on a CSV file with `text`,`label` (or
    /// `text_a`,`text_b`,`label`) columns.
    pub fn train(
        &mut self,
        input_path: &Path,
        args: &TrainArgs,
        eval_path: Option<&Path>,
    ) -> Result<(), TrainError>
    where
        M: TrainStep<Input = SequenceBatch<B>, Output = ClassificationOutput<B>> + 'static,
        M::InnerModule: InferenceStep<
                Input = SequenceBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_train_args(args, self.accelerator, eval_path.is_some())?;

        let encoder =
            SequenceEncoder::new(self.tokenizer.clone(), args.max_length, self.num_labels);
        let (train, eval) = prepare_train(&encoder, input_path, eval_path, args)?;

        let batcher = SequenceBatcher::new(self.tokenizer.pad_token(), args.max_length);
        let trained = dispatch::fit(
            self.model.clone(),
            batcher,
            train,
            eval,
            args,
            Task::SequenceClassification,
            self.tokenizer.pad_token(),
        )?;
        self.model = trained;
        Ok(())
    }

    pub fn eval(&self, input_path: &Path, args: &EvalArgs) -> Result<EvalResult, TrainError>
    where
        M::InnerModule: InferenceStep<
                Input = SequenceBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_eval_args(args)?;

        let encoder =
            SequenceEncoder::new(self.tokenizer.clone(), args.max_length, self.num_labels);
        let examples = prepare_eval(&encoder, input_path, args)?;

        let batcher = SequenceBatcher::new(self.tokenizer.pad_token(), args.max_length);
        Ok(dispatch::evaluate(
            &self.model.valid(),
            batcher,
            examples,
            args,
        ))
    }

    /// Batch inference over the `text` column of a CSV file, one result per
    /// row in file order.
    pub fn test(&self, input_path: &Path) -> Result<Vec<ClassificationResult>, TrainError> {
        FileFormat::resolve_for(input_path, &[FileFormat::Csv])?;

        let rows = records::load_text_column(input_path)?;
        rows.iter()
            .map(|row| self.classify_text(&row.text))
            .collect()
    }

    pub fn save(&self, dir: &Path) -> Result<(), TrainError> {
        std::fs::create_dir_all(dir)?;

        let config = ClassifierConfig {
            num_labels: self.num_labels,
            id2label: self.id2label.clone(),
        };
        std::fs::write(
            dir.join("config.json"),
            serde_json::to_string_pretty(&config)?,
        )?;

        DefaultRecorder::new().record(self.model.clone().into_record(), dir.join("model"))?;
        self.tokenizer.save(dir)?;
        Ok(())
    }

    pub fn push(&self, repo_name: &str, private: bool) -> Result<(), TrainError> {
        let staging = tempfile::tempdir()?;
        self.save(staging.path())?;

        let client = HubClient::from_env()?;
        tracing::info!("pushing model and tokenizer to {repo_name}");
        client.push(repo_name, staging.path(), private)?;
        Ok(())
    }

    /// Classify a single text, mapping the winning class index back to its
    /// configured name.
    pub fn classify_text(&self, text: &str) -> Result<ClassificationResult, TrainError> {
        validate_text_input(text)?;

        let ids = self.tokenizer.encode(text, true);
        if ids.is_empty() {
            return Err(TrainError::InvalidArgument(
                "the text produced no tokens".to_string(),
            ));
        }

        let ids_i32: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
        let tokens = Tensor::<B::InnerBackend, 1, Int>::from_ints(ids_i32.as_slice(), &self.device)
            .reshape([1, ids.len()]);
        let mask_pad = tokens.clone().equal_elem(self.tokenizer.pad_token() as i32);

        let logits = self.model.valid().forward_logits(tokens, mask_pad);
        let probs = softmax(logits, 1);
        let scores: Vec<f32> = probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap();

        let (index, score) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .expect("classifier produced no logits");

        let label = self
            .id2label
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{index}"));

        Ok(ClassificationResult {
            label,
            score: *score,
        })
    }
}
