//! Trainer/evaluator dispatch: argument validation, trainer construction
//! from the argument schema, and normalized evaluation results.

use blithe_config::{EvalArgs, ReportTarget, Task, TrainArgs};
use burn::{
    data::{
        dataloader::{DataLoaderBuilder, batcher::Batcher},
        dataset::InMemDataset,
    },
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::AdamWConfig,
    prelude::*,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
    train::{
        ClassificationOutput, InferenceStep, Learner, SupervisedTraining, TrainStep,
        metric::{AccuracyMetric, LearningRateMetric, LossMetric, PerplexityMetric},
    },
};

use crate::device::Accelerator;
use crate::error::TrainError;
use crate::metrics;

/// Results from model evaluation.
#[derive(Clone, Copy, Debug)]
pub struct EvalResult {
    pub loss: f64,
}

impl EvalResult {
    #[must_use]
    pub fn perplexity(&self) -> f64 {
        self.loss.exp()
    }
}

/// Validate training arguments eagerly, before any dataset is touched.
pub fn validate_train_args(
    args: &TrainArgs,
    accelerator: Accelerator,
    has_eval_path: bool,
) -> Result<(), TrainError> {
    if args.fp16 && !accelerator.supports_fp16() {
        return Err(TrainError::DeviceUnsupported(format!(
            "fp16 is only available when a GPU accelerator is being used, found {accelerator}"
        )));
    }

    if !has_eval_path && args.eval_ratio <= 0.0 {
        return Err(TrainError::InvalidArgument(
            "set TrainArgs.eval_ratio to greater than 0 or supply an eval path".to_string(),
        ));
    }
    if args.eval_ratio > 1.0 {
        return Err(TrainError::InvalidArgument(format!(
            "eval_ratio must be in (0, 1], got {}",
            args.eval_ratio
        )));
    }

    if args.num_train_epochs == 0 {
        return Err(TrainError::InvalidArgument(
            "num_train_epochs must be at least 1".to_string(),
        ));
    }
    if args.batch_size == 0 || args.gas == 0 {
        return Err(TrainError::InvalidArgument(
            "batch_size and gas must be at least 1".to_string(),
        ));
    }

    if let Some(path) = &args.save_preprocessed_data_path {
        blithe_data::cache::ensure_directory_path(path)?;
    }
    if let Some(path) = &args.load_preprocessed_data_path {
        blithe_data::cache::ensure_directory_path(path)?;
    }

    Ok(())
}

/// Validate evaluation arguments eagerly.
pub fn validate_eval_args(args: &EvalArgs) -> Result<(), TrainError> {
    if args.batch_size == 0 {
        return Err(TrainError::InvalidArgument(
            "batch_size must be at least 1".to_string(),
        ));
    }
    if let Some(path) = &args.save_preprocessed_data_path {
        blithe_data::cache::ensure_directory_path(path)?;
    }
    if let Some(path) = &args.load_preprocessed_data_path {
        blithe_data::cache::ensure_directory_path(path)?;
    }
    Ok(())
}

fn adamw(args: &TrainArgs) -> AdamWConfig {
    AdamWConfig::new()
        .with_beta_1(args.adam_beta1)
        .with_beta_2(args.adam_beta2)
        .with_epsilon(args.adam_epsilon)
        .with_weight_decay(args.weight_decay)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(args.max_grad_norm)))
}

/// Common training loop: build dataloaders and the supervised-training
/// configuration from the argument schema, then run the task-appropriate
/// trainer shape and hand back the updated model.
pub fn fit<B, M, I, C, TIn, TInner>(
    model: M,
    batcher: C,
    train_examples: Vec<I>,
    eval_examples: Vec<I>,
    args: &TrainArgs,
    task: Task,
    pad_token: usize,
) -> Result<M, TrainError>
where
    B: AutodiffBackend,
    I: Clone + Send + Sync + std::fmt::Debug + 'static,
    TIn: Send + 'static,
    TInner: Send + 'static,
    M: AutodiffModule<B>
        + TrainStep<Input = TIn, Output = ClassificationOutput<B>>
        + 'static,
    M::InnerModule: InferenceStep<Input = TInner, Output = ClassificationOutput<B::InnerBackend>>,
    C: Batcher<B, I, TIn>
        + Batcher<B::InnerBackend, I, TInner>
        + Clone
        + Send
        + Sync
        + 'static,
{
    let artifact_dir = &args.output_dir;
    std::fs::create_dir_all(artifact_dir)?;
    std::fs::write(
        format!("{artifact_dir}/train_args.json"),
        serde_json::to_string_pretty(args)?,
    )?;

    tracing::info!(
        "training {task} model for {} epochs ({} train / {} eval examples)",
        args.num_train_epochs,
        train_examples.len(),
        eval_examples.len()
    );

    let dataloader_train = DataLoaderBuilder::new(batcher.clone())
        .batch_size(args.batch_size)
        .num_workers(args.num_workers)
        .build(InMemDataset::new(train_examples));

    let dataloader_eval = DataLoaderBuilder::new(batcher)
        .batch_size(args.batch_size)
        .num_workers(args.num_workers)
        .build(InMemDataset::new(eval_examples));

    let optim = adamw(args).init();

    let mut training = SupervisedTraining::new(artifact_dir, dataloader_train, dataloader_eval)
        .metric_train(LossMetric::new())
        .metric_train_numeric(LearningRateMetric::new())
        .grads_accumulation(args.gas)
        .num_epochs(args.num_train_epochs);

    if args.eval_steps > 0 {
        training = training.metric_valid(LossMetric::new());
    }

    // The trainer shape follows the task variant: language-model tasks get
    // perplexity and pad-aware accuracy, classification gets plain accuracy,
    // seq2seq runs with the loss metric only.
    match task {
        Task::CausalLm | Task::MaskedLm => {
            training = training
                .metric_train(PerplexityMetric::new())
                .metric_train_numeric(AccuracyMetric::new().with_pad_token(pad_token));
            if args.eval_steps > 0 {
                training = training
                    .metric_valid(PerplexityMetric::new())
                    .metric_valid_numeric(AccuracyMetric::new().with_pad_token(pad_token));
            }
        }
        Task::SequenceClassification => {
            training = training.metric_train_numeric(AccuracyMetric::new());
            if args.eval_steps > 0 {
                training = training.metric_valid_numeric(AccuracyMetric::new());
            }
        }
        Task::Seq2Seq => {}
    }

    if args.save_steps > 0 {
        training = training.with_file_checkpointer(CompactRecorder::new());
    }
    if args.logging_steps > 0 || args.report_to.contains(&ReportTarget::Summary) {
        training = training.summary();
    }

    let result = training.launch(Learner::new(model, optim, args.learning_rate));

    if args.report_to.contains(&ReportTarget::Csv) {
        metrics::export_run(std::path::Path::new(artifact_dir))?;
    }

    tracing::info!("training completed, artifacts saved to {artifact_dir}");

    Ok(result.model)
}

/// Evaluation loop: average batch loss over the whole partition, normalized
/// into an [`EvalResult`].
pub fn evaluate<B, M, I, C, T>(
    model: &M,
    batcher: C,
    examples: Vec<I>,
    args: &EvalArgs,
) -> EvalResult
where
    B: Backend,
    I: Clone + Send + Sync + std::fmt::Debug + 'static,
    T: Send + 'static,
    M: InferenceStep<Input = T, Output = ClassificationOutput<B>>,
    C: Batcher<B, I, T> + Clone + Send + Sync + 'static,
{
    let dataloader = DataLoaderBuilder::new(batcher)
        .batch_size(args.batch_size)
        .num_workers(args.num_workers)
        .build(InMemDataset::new(examples));

    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;

    tracing::info!("running evaluation");
    for batch in dataloader.iter() {
        let output = model.step(batch);
        let loss_data = output.loss.into_data();
        let loss_val = f64::from(loss_data.convert::<f32>().as_slice::<f32>().unwrap()[0]);
        total_loss += loss_val;
        num_batches += 1;

        if num_batches.is_multiple_of(10) {
            let running_avg = total_loss / num_batches as f64;
            tracing::info!("batch {num_batches}: loss = {loss_val:.4}, running avg = {running_avg:.4}");
        }
    }

    let loss = if num_batches > 0 {
        total_loss / num_batches as f64
    } else {
        0.0
    };

    EvalResult { loss }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp16_requires_gpu() {
        let args = TrainArgs {
            fp16: true,
            ..Default::default()
        };
        let err = validate_train_args(&args, Accelerator::Cpu, false);
        assert!(matches!(err, Err(TrainError::DeviceUnsupported(_))));

        assert!(validate_train_args(&args, Accelerator::Cuda, false).is_ok());
    }

    #[test]
    fn test_eval_ratio_must_be_positive_without_eval_path() {
        let args = TrainArgs {
            eval_ratio: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_train_args(&args, Accelerator::Cpu, false),
            Err(TrainError::InvalidArgument(_))
        ));

        // An explicit eval path makes the ratio irrelevant.
        assert!(validate_train_args(&args, Accelerator::Cpu, true).is_ok());
    }

    #[test]
    fn test_eval_ratio_upper_bound() {
        let args = TrainArgs {
            eval_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            validate_train_args(&args, Accelerator::Cpu, false),
            Err(TrainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_legacy_cache_path_rejected() {
        let args = TrainArgs {
            save_preprocessed_data: true,
            save_preprocessed_data_path: Some("preprocessed.json".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_train_args(&args, Accelerator::Cpu, false),
            Err(TrainError::Data(
                blithe_data::DataError::InvalidCachePath(_)
            ))
        ));
    }

    #[test]
    fn test_eval_result_perplexity() {
        let result = EvalResult { loss: 0.0 };
        assert_eq!(result.perplexity(), 1.0);
    }
}
