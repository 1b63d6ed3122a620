//! Text-generation facade over a causal language model.

use std::path::Path;
use std::sync::Arc;

use blithe_config::{EvalArgs, GenerationSettings, Task, TrainArgs};
use blithe_data::batcher::{CausalBatcher, CausalTrainingBatch};
use blithe_data::encode::CausalEncoder;
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
use crate::model::CausalLm;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationResult {
    pub text: String,
}

/// Facade exposing train/eval/save/push plus single-prompt generation.
///
/// The facade exclusively owns its model/tokenizer pair. Concurrent train or
/// eval calls on one instance are not guarded and must be avoided by the
/// caller.
pub struct TextGenerator<B: AutodiffBackend, M> {
    model: M,
    tokenizer: Arc<dyn TokenizerTrait>,
    accelerator: Accelerator,
    device: B::Device,
}

impl<B, M> TextGenerator<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CausalLm<B>,
    M::InnerModule: CausalLm<B::InnerBackend>,
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

    /// Load a previously saved generator. `model` must be a freshly
    /// initialized instance of the architecture the artifact was saved from;
    /// its weights are replaced by the stored record.
    pub fn from_artifacts(
        dir: &Path,
        model: M,
        tokenizer: Arc<dyn TokenizerTrait>,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        let record = DefaultRecorder::new().load(dir.join("model").into(), &device)?;
        let model = model.load_record(record);
        Ok(Self::new(model, tokenizer, device))
    }

    pub fn accelerator(&self) -> Accelerator {
        self.accelerator
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Fine-tune on a text file (one example per line). With no eval path,
    /// an `eval_ratio` fraction of the file is held out for evaluation.
    pub fn train(
        &mut self,
        input_path: &Path,
        args: &TrainArgs,
        eval_path: Option<&Path>,
    ) -> Result<(), TrainError>
    where
        M: TrainStep<Input = CausalTrainingBatch<B>, Output = ClassificationOutput<B>> + 'static,
        M::InnerModule: InferenceStep<
                Input = CausalTrainingBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_train_args(args, self.accelerator, eval_path.is_some())?;

        let encoder = CausalEncoder::new(self.tokenizer.clone(), args.max_length);
        let (train, eval) = prepare_train(&encoder, input_path, eval_path, args)?;

        let batcher = CausalBatcher::new(self.tokenizer.pad_token(), args.max_length);
        let trained = dispatch::fit(
            self.model.clone(),
            batcher,
            train,
            eval,
            args,
            Task::CausalLm,
            self.tokenizer.pad_token(),
        )?;
        self.model = trained;
        Ok(())
    }

    pub fn eval(&self, input_path: &Path, args: &EvalArgs) -> Result<EvalResult, TrainError>
    where
        M::InnerModule: InferenceStep<
                Input = CausalTrainingBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_eval_args(args)?;

        let encoder = CausalEncoder::new(self.tokenizer.clone(), args.max_length);
        let examples = prepare_eval(&encoder, input_path, args)?;

        let batcher = CausalBatcher::new(self.tokenizer.pad_token(), args.max_length);
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

    /// Save model record and tokenizer to a directory. The saved artifact
    /// loads back through [`TextGenerator::from_artifacts`] with identical
    /// inference behavior.
    pub fn save(&self, dir: &Path) -> Result<(), TrainError> {
        std::fs::create_dir_all(dir)?;
        DefaultRecorder::new().record(self.model.clone().into_record(), dir.join("model"))?;
        self.tokenizer.save(dir)?;
        Ok(())
    }

    /// Upload the saved artifact under a remote repository name.
    pub fn push(&self, repo_name: &str, private: bool) -> Result<(), TrainError> {
        let staging = tempfile::tempdir()?;
        self.save(staging.path())?;

        let client = HubClient::from_env()?;
        tracing::info!("pushing model and tokenizer to {repo_name}");
        client.push(repo_name, staging.path(), private)?;
        Ok(())
    }

    /// Generate a continuation for a prompt. The echoed prompt is stripped
    /// from the returned text.
    pub fn generate_text(
        &self,
        text: &str,
        settings: &GenerationSettings,
    ) -> Result<GenerationResult, TrainError> {
        validate_text_input(text)?;

        let input_ids = self.tokenizer.encode(text, true);
        if input_ids.is_empty() {
            return Err(TrainError::InvalidArgument(
                "the prompt produced no tokens".to_string(),
            ));
        }
        let prompt_len = input_ids.len();

        let ids_i32: Vec<i32> = input_ids.iter().map(|&id| id as i32).collect();
        let input = Tensor::<B::InnerBackend, 1, Int>::from_ints(ids_i32.as_slice(), &self.device)
            .reshape([1, prompt_len]);

        let generated = self.model.valid().generate(input, settings);
        let generated_ids: Vec<usize> = generated
            .into_data()
            .convert::<i32>()
            .to_vec::<i32>()
            .unwrap()
            .into_iter()
            .map(|id| id as usize)
            .collect();

        let continuation = &generated_ids[prompt_len.min(generated_ids.len())..];
        Ok(GenerationResult {
            text: self.tokenizer.decode(continuation, true),
        })
    }
}
