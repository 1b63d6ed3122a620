//! Text-to-text facade over an encoder-decoder model.

use std::path::Path;
use std::sync::Arc;

use blithe_config::{EvalArgs, GenerationSettings, Task, TrainArgs};
use blithe_data::batcher::{Seq2SeqBatch, Seq2SeqBatcher};
use blithe_data::encode::Seq2SeqEncoder;
use blithe_data::tokenizer::TokenizerTrait;
use blithe_data::{prepare_eval, prepare_train};
use burn::{
    module::AutodiffModule,
    prelude::*,
    record::{DefaultRecorder, Recorder},
    tensor::backend::AutodiffBackend,
    train::{ClassificationOutput, InferenceStep, TrainStep},
};

use crate::device::Accelerator;
use crate::dispatch::{self, EvalResult};
use crate::error::{TrainError, validate_text_input};
use crate::hub::HubClient;
use crate::model::Seq2SeqLm;

#[derive(Clone, Debug, PartialEq)]
pub struct TextToTextResult {
    pub text: String,
}

/// Facade for sequence-to-sequence transformation (translation, grammar
/// correction, summarization-style tasks) trained on `input`,`target` CSV
/// pairs.
pub struct TextToText<B: AutodiffBackend, M> {
    model: M,
    tokenizer: Arc<dyn TokenizerTrait>,
    accelerator: Accelerator,
    device: B::Device,
}

impl<B, M> TextToText<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Seq2SeqLm<B>,
    M::InnerModule: Seq2SeqLm<B::InnerBackend>,
{
    pub fn new(model: M, tokenizer: Arc<dyn TokenizerTrait>, device: B::Device) -> Self {
        let accelerator = Accelerator::detect();
        tracing::info!("using device: {accelerator}");
        Self {
            model,
            tokenizer,
            accelerator,
            device,
        }
    }

    /// Load a previously saved model; see `TextGenerator::from_artifacts`.
    pub fn from_artifacts(
        dir: &Path,
        model: M,
        tokenizer: Arc<dyn TokenizerTrait>,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        let record = DefaultRecorder::new().load(dir.join("model"), &device)?;
        let model = model.load_record(record);
        Ok(Self::new(model, tokenizer, device))
    }

    pub fn accelerator(&self) -> Accelerator {
        self.accelerator
    }

    /// Fine-tune on a CSV file with `input` and `target` columns. The
    /// sequence-to-sequence trainer shape is selected at dispatch.
    pub fn train(
        &mut self,
        input_path: &Path,
        args: &TrainArgs,
        eval_path: Option<&Path>,
    ) -> Result<(), TrainError>
    where
        M: TrainStep<Input = Seq2SeqBatch<B>, Output = ClassificationOutput<B>> + 'static,
        M::InnerModule: InferenceStep<
                Input = Seq2SeqBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_train_args(args, self.accelerator, eval_path.is_some())?;

        let encoder = Seq2SeqEncoder::new(
            self.tokenizer.clone(),
            args.max_input_length,
            args.max_output_length,
        );
        let (train, eval) = prepare_train(&encoder, input_path, eval_path, args)?;

        let batcher = Seq2SeqBatcher::new(
            self.tokenizer.pad_token(),
            args.max_input_length,
            args.max_output_length,
        );
        let trained = dispatch::fit(
            self.model.clone(),
            batcher,
            train,
            eval,
            args,
            Task::Seq2Seq,
            self.tokenizer.pad_token(),
        )?;
        self.model = trained;
        Ok(())
    }

    pub fn eval(&self, input_path: &Path, args: &EvalArgs) -> Result<EvalResult, TrainError>
    where
        M::InnerModule: InferenceStep<
                Input = Seq2SeqBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_eval_args(args)?;

        let encoder = Seq2SeqEncoder::new(
            self.tokenizer.clone(),
            args.max_input_length,
            args.max_output_length,
        );
        let examples = prepare_eval(&encoder, input_path, args)?;

        let batcher = Seq2SeqBatcher::new(
            self.tokenizer.pad_token(),
            args.max_input_length,
            args.max_output_length,
        );
        Ok(dispatch::evaluate(
            &self.model.valid(),
            batcher,
            examples,
            args,
        ))
    }

    pub fn test(&self, _input_path: &Path) -> Result<(), TrainError> {
        Err(TrainError::NotSupported("test()"))
    }

    pub fn save(&self, dir: &Path) -> Result<(), TrainError> {
        std::fs::create_dir_all(dir)?;
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

    /// Transform a single input text into its target-side text.
    pub fn generate_text(
        &self,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<TextToTextResult, TrainError> {
        validate_text_input(text)?;

        let source_ids = self.tokenizer.encode(text, true);
        if source_ids.is_empty() {
            return Err(TrainError::InvalidArgument(
                "the input produced no tokens".to_string(),
            ));
        }

        let ids_i32: Vec<i32> = source_ids.iter().map(|&id| id as i32).collect();
        let source = Tensor::<B::InnerBackend, 1, Int>::from_ints(ids_i32.as_slice(), &self.device)
            .reshape([1, source_ids.len()]);
        let source_mask = source
            .clone()
            .equal_elem(self.tokenizer.pad_token() as i32);

        let generated = self.model.valid().generate(source, source_mask, settings);
        let target_ids: Vec<usize> = generated
            .into_data()
            .convert::<i32>()
            .to_vec::<i32>()
            .unwrap()
            .into_iter()
            .map(|id| id as usize)
            .collect();

        Ok(TextToTextResult {
            text: self.tokenizer.decode(&target_ids, true),
        })
    }
}
