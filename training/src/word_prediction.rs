//! Masked-word prediction facade.

use std::path::Path;
use std::sync::Arc;

use blithe_config::{EvalArgs, Task, TrainArgs};
use blithe_data::batcher::{MaskedLmBatch, MaskedLmBatcher};
use blithe_data::encode::MaskedEncoder;
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

use crate::device::Accelerator;
use crate::dispatch::{self, EvalResult};
use crate::error::{TrainError, validate_text_input};
use crate::hub::HubClient;
use crate::model::MaskedLm;

#[derive(Clone, Debug, PartialEq)]
pub struct WordPredictionResult {
    pub token: String,
    pub score: f32,
}

/// Facade for masked-word prediction. Training applies stochastic masking at
/// collation time with the configured `mlm_probability`.
pub struct WordPredictor<B: AutodiffBackend, M> {
    model: M,
    tokenizer: Arc<dyn TokenizerTrait>,
    accelerator: Accelerator,
    device: B::Device,
}

impl<B, M> WordPredictor<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + MaskedLm<B>,
    M::InnerModule: MaskedLm<B::InnerBackend>,
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

    /// Load a previously saved predictor; see `TextGenerator::from_artifacts`.
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

    fn mask_token(&self) -> Result<usize, TrainError> {
        self.tokenizer.mask_token().ok_or_else(|| {
            TrainError::InvalidArgument(
                "the active tokenizer does not define a mask token".to_string(),
            )
        })
    }

    /// Fine-tune on a text file (one example per line). The collation policy
    /// picks up `args.mlm_probability` just before the run.
    pub fn train(
        &mut self,
        input_path: &Path,
        args: &TrainArgs,
        eval_path: Option<&Path>,
    ) -> Result<(), TrainError>
    where
        M: TrainStep<Input = MaskedLmBatch<B>, Output = ClassificationOutput<B>> + 'static,
        M::InnerModule: InferenceStep<
                Input = MaskedLmBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_train_args(args, self.accelerator, eval_path.is_some())?;
        let mask_token = self.mask_token()?;

        let encoder = MaskedEncoder::new(self.tokenizer.clone(), args.max_length);
        let (train, eval) = prepare_train(&encoder, input_path, eval_path, args)?;

        let batcher = MaskedLmBatcher::new(self.tokenizer.pad_token(), mask_token, args.max_length)
            .with_mlm_probability(args.mlm_probability);
        let trained = dispatch::fit(
            self.model.clone(),
            batcher,
            train,
            eval,
            args,
            Task::MaskedLm,
            self.tokenizer.pad_token(),
        )?;
        self.model = trained;
        Ok(())
    }

    pub fn eval(&self, input_path: &Path, args: &EvalArgs) -> Result<EvalResult, TrainError>
    where
        M::InnerModule: InferenceStep<
                Input = MaskedLmBatch<B::InnerBackend>,
                Output = ClassificationOutput<B::InnerBackend>,
            >,
    {
        dispatch::validate_eval_args(args)?;
        let mask_token = self.mask_token()?;

        let encoder = MaskedEncoder::new(self.tokenizer.clone(), args.max_length);
        let examples = prepare_eval(&encoder, input_path, args)?;

        let batcher = MaskedLmBatcher::new(self.tokenizer.pad_token(), mask_token, args.max_length)
            .with_mlm_probability(args.mlm_probability);
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

    /// Predict the word behind the single mask token in `text`. With
    /// `targets` set, only those candidate tokens are scored.
    pub fn predict_mask(
        &self,
        text: &str,
        targets: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<WordPredictionResult>, TrainError> {
        validate_text_input(text)?;
        let mask_token = self.mask_token()?;

        let ids = self.tokenizer.encode(text, true);
        let mask_positions: Vec<usize> = ids
            .iter()
            .enumerate()
            .filter_map(|(pos, &id)| (id == mask_token).then_some(pos))
            .collect();
        let [mask_position] = mask_positions.as_slice() else {
            return Err(TrainError::InvalidArgument(format!(
                "the input must contain exactly one mask token, found {}",
                mask_positions.len()
            )));
        };
        let mask_position = *mask_position;

        let ids_i32: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
        let tokens = Tensor::<B::InnerBackend, 1, Int>::from_ints(ids_i32.as_slice(), &self.device)
            .reshape([1, ids.len()]);
        let mask_pad = tokens.clone().equal_elem(self.tokenizer.pad_token() as i32);

        let logits = self.model.valid().forward_logits(tokens, mask_pad);
        let [_, seq_length, vocab] = logits.dims();
        debug_assert!(mask_position < seq_length);

        let position_logits = logits
            .slice([0..1, mask_position..mask_position + 1, 0..vocab])
            .reshape([vocab]);
        let scores: Vec<f32> = softmax(position_logits, 0)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap();

        let mut predictions: Vec<WordPredictionResult> = match targets {
            Some(targets) => targets
                .iter()
                .filter_map(|target| {
                    let Some(&score) = self
                        .tokenizer
                        .token_to_id(target)
                        .and_then(|id| scores.get(id))
                    else {
                        tracing::warn!("target '{target}' is not in the vocabulary, skipping");
                        return None;
                    };
                    Some(WordPredictionResult {
                        token: target.clone(),
                        score,
                    })
                })
                .collect(),
            None => scores
                .iter()
                .enumerate()
                .filter_map(|(id, &score)| {
                    self.tokenizer
                        .id_to_token(id)
                        .map(|token| WordPredictionResult { token, score })
                })
                .collect(),
        };

        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        predictions.truncate(top_k);
        Ok(predictions)
    }
}
