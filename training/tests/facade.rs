//! Facade tests against tiny stand-in models on the CPU backend.
//!
//! Validation failures are checked with nonexistent input paths on purpose:
//! the error kind proves the argument check ran before any file was touched.

use std::path::Path;
use std::sync::Arc;

use blithe_config::{EvalArgs, GenerationSettings, TrainArgs};
use blithe_data::batcher::{CausalTrainingBatch, MaskedLmBatch, SequenceBatch};
use blithe_data::test_utils::WordTokenizer;
use blithe_data::tokenizer::TokenizerTrait;
use blithe_training::{
    CausalLm, MaskedLm, SequenceClassifier, TextClassifier, TextGenerator, TrainError,
    WordPredictor,
};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::{Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::train::{ClassificationOutput, InferenceStep, TrainOutput, TrainStep};

type TestBackend = burn::backend::Autodiff<burn::backend::Cpu<f32>>;

const VOCAB: usize = 14;
const HIDDEN: usize = 8;
const PAD: usize = 0;

fn tokenizer() -> Arc<dyn TokenizerTrait> {
    Arc::new(WordTokenizer::new(&[
        "the", "cat", "sat", "on", "a", "mat", "dog", "ran",
    ]))
}

#[derive(Module, Debug)]
struct TinyLm<B: Backend> {
    embedding: Embedding<B>,
    output: Linear<B>,
    pad_token: usize,
    vocab_size: usize,
}

impl<B: Backend> TinyLm<B> {
    fn init(device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(VOCAB, HIDDEN).init(device),
            output: LinearConfig::new(HIDDEN, VOCAB).init(device),
            pad_token: PAD,
            vocab_size: VOCAB,
        }
    }

    fn logits(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.output.forward(self.embedding.forward(tokens))
    }

    fn lm_output(
        &self,
        inputs: Tensor<B, 2, Int>,
        targets: Tensor<B, 2, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, seq_length] = inputs.dims();
        let output = self
            .logits(inputs)
            .reshape([batch_size * seq_length, self.vocab_size]);
        let targets = targets.reshape([batch_size * seq_length]);

        let loss = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![self.pad_token]))
            .init(&output.device());
        let loss = loss.forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}

impl<B: Backend> CausalLm<B> for TinyLm<B> {
    fn forward_training(&self, batch: CausalTrainingBatch<B>) -> ClassificationOutput<B> {
        self.lm_output(batch.tokens_inputs, batch.targets)
    }

    fn generate(
        &self,
        tokens: Tensor<B, 2, Int>,
        settings: &GenerationSettings,
    ) -> Tensor<B, 2, Int> {
        let mut generated = tokens;
        for _ in 0..settings.max_new_tokens {
            let logits = self.logits(generated.clone());
            let [batch_size, seq_length, vocab] = logits.dims();
            let last = logits
                .slice([0..batch_size, seq_length - 1..seq_length, 0..vocab])
                .reshape([batch_size, vocab]);
            let next = last.argmax(1);
            generated = Tensor::cat(vec![generated, next], 1);
        }
        generated
    }
}

impl<B: Backend> MaskedLm<B> for TinyLm<B> {
    fn forward_training(&self, batch: MaskedLmBatch<B>) -> ClassificationOutput<B> {
        self.lm_output(batch.tokens_inputs, batch.targets)
    }

    fn forward_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        _mask_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        self.logits(tokens)
    }
}

impl<B: AutodiffBackend> TrainStep for TinyLm<B> {
    type Input = CausalTrainingBatch<B>;
    type Output = ClassificationOutput<B>;

    fn step(&self, item: Self::Input) -> TrainOutput<Self::Output> {
        let output = CausalLm::forward_training(self, item);
        let grads = output.loss.backward();
        TrainOutput::new(self, grads, output)
    }
}

impl<B: Backend> InferenceStep for TinyLm<B> {
    type Input = CausalTrainingBatch<B>;
    type Output = ClassificationOutput<B>;

    fn step(&self, item: Self::Input) -> Self::Output {
        CausalLm::forward_training(self, item)
    }
}

#[derive(Module, Debug)]
struct TinyClassifier<B: Backend> {
    embedding: Embedding<B>,
    output: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> TinyClassifier<B> {
    fn init(num_classes: usize, device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(VOCAB, HIDDEN).init(device),
            output: LinearConfig::new(HIDDEN, num_classes).init(device),
            num_classes,
        }
    }
}

impl<B: Backend> SequenceClassifier<B> for TinyClassifier<B> {
    fn forward_training(&self, batch: SequenceBatch<B>) -> ClassificationOutput<B> {
        let output = self.forward_logits(batch.tokens, batch.mask_pad);
        let loss = CrossEntropyLossConfig::new().init(&output.device());
        let loss = loss.forward(output.clone(), batch.labels.clone());
        ClassificationOutput {
            loss,
            output,
            targets: batch.labels,
        }
    }

    fn forward_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        _mask_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 2> {
        let pooled = self.embedding.forward(tokens).mean_dim(1).squeeze_dim::<2>(1);
        self.output.forward(pooled)
    }
}

impl<B: AutodiffBackend> TrainStep for TinyClassifier<B> {
    type Input = SequenceBatch<B>;
    type Output = ClassificationOutput<B>;

    fn step(&self, item: Self::Input) -> TrainOutput<Self::Output> {
        let output = self.forward_training(item);
        let grads = output.loss.backward();
        TrainOutput::new(self, grads, output)
    }
}

impl<B: Backend> InferenceStep for TinyClassifier<B> {
    type Input = SequenceBatch<B>;
    type Output = ClassificationOutput<B>;

    fn step(&self, item: Self::Input) -> Self::Output {
        self.forward_training(item)
    }
}

fn generator() -> TextGenerator<TestBackend, TinyLm<TestBackend>> {
    let device = Default::default();
    TextGenerator::new(TinyLm::init(&device), tokenizer(), device)
}

#[test]
fn eval_ratio_zero_fails_before_touching_data() {
    let mut generator = generator();
    let args = TrainArgs {
        eval_ratio: 0.0,
        ..Default::default()
    };
    let err = generator.train(Path::new("/nonexistent/train.txt"), &args, None);
    assert!(matches!(err, Err(TrainError::InvalidArgument(_))));
}

#[test]
fn fp16_on_cpu_fails_before_touching_data() {
    let mut generator = generator();
    let args = TrainArgs {
        fp16: true,
        ..Default::default()
    };
    let err = generator.train(Path::new("/nonexistent/train.txt"), &args, None);
    assert!(matches!(err, Err(TrainError::DeviceUnsupported(_))));
}

#[test]
fn generator_test_is_not_supported() {
    let generator = generator();
    assert!(matches!(
        generator.test(Path::new("anything.txt")),
        Err(TrainError::NotSupported(_))
    ));
}

#[test]
fn generate_text_rejects_empty_input() {
    let generator = generator();
    let err = generator.generate_text("", &GenerationSettings::default());
    assert!(matches!(err, Err(TrainError::InvalidArgument(_))));
}

#[test]
fn greedy_generation_is_deterministic() {
    let generator = generator();
    let settings = GenerationSettings {
        max_new_tokens: 4,
        ..Default::default()
    };
    let first = generator.generate_text("the cat", &settings).unwrap();
    let second = generator.generate_text("the cat", &settings).unwrap();
    assert_eq!(first, second);
}

#[test]
fn save_then_reload_preserves_generation() {
    let generator = generator();
    let settings = GenerationSettings {
        max_new_tokens: 4,
        ..Default::default()
    };
    let before = generator.generate_text("the cat sat", &settings).unwrap();

    let dir = tempfile::tempdir().unwrap();
    generator.save(dir.path()).unwrap();
    assert!(dir.path().join("words.txt").exists());

    let device = Default::default();
    let reloaded = TextGenerator::<TestBackend, _>::from_artifacts(
        dir.path(),
        TinyLm::init(&device),
        tokenizer(),
        device,
    )
    .unwrap();
    let after = reloaded.generate_text("the cat sat", &settings).unwrap();

    assert_eq!(before, after);
}

#[test]
fn eval_computes_finite_loss() {
    let generator = generator();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("eval.txt");
    std::fs::write(&input, "the cat sat on a mat\ndog ran\nthe dog sat\n").unwrap();

    let args = EvalArgs {
        batch_size: 2,
        ..Default::default()
    };
    let result = generator.eval(&input, &args).unwrap();
    assert!(result.loss.is_finite());
    assert!(result.perplexity() >= 1.0);
}

#[test]
fn classifier_roundtrips_labels_through_save() {
    let device: <TestBackend as Backend>::Device = Default::default();
    let classifier = TextClassifier::<TestBackend, _>::new(
        TinyClassifier::init(2, &device),
        tokenizer(),
        device.clone(),
        2,
    )
    .with_labels(vec!["negative".to_string(), "positive".to_string()])
    .unwrap();

    let result = classifier.classify_text("the cat sat").unwrap();
    assert!(["negative", "positive"].contains(&result.label.as_str()));
    assert!(result.score > 0.0 && result.score <= 1.0);

    let dir = tempfile::tempdir().unwrap();
    classifier.save(dir.path()).unwrap();

    let reloaded = TextClassifier::<TestBackend, _>::from_artifacts(
        dir.path(),
        TinyClassifier::init(2, &device),
        tokenizer(),
        device,
    )
    .unwrap();
    assert_eq!(reloaded.num_labels(), 2);
    assert_eq!(
        reloaded.classify_text("the cat sat").unwrap(),
        result,
        "reloaded classifier must behave identically"
    );
}

#[test]
fn classifier_rejects_wrong_label_count() {
    let device: <TestBackend as Backend>::Device = Default::default();
    let classifier = TextClassifier::<TestBackend, _>::new(
        TinyClassifier::init(2, &device),
        tokenizer(),
        device,
        2,
    );
    assert!(matches!(
        classifier.with_labels(vec!["only-one".to_string()]),
        Err(TrainError::InvalidArgument(_))
    ));
}

#[test]
fn classifier_test_batch_classifies_csv() {
    let device: <TestBackend as Backend>::Device = Default::default();
    let classifier = TextClassifier::<TestBackend, _>::new(
        TinyClassifier::init(2, &device),
        tokenizer(),
        device,
        2,
    );

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("test.csv");
    std::fs::write(&input, "text\nthe cat sat\ndog ran\n").unwrap();

    let results = classifier.test(&input).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn predictor_requires_exactly_one_mask() {
    let device = Default::default();
    let predictor =
        WordPredictor::<TestBackend, _>::new(TinyLm::init(&device), tokenizer(), device);

    let err = predictor.predict_mask("the cat sat", None, 5);
    assert!(matches!(err, Err(TrainError::InvalidArgument(_))));

    let err = predictor.predict_mask("<mask> cat <mask>", None, 5);
    assert!(matches!(err, Err(TrainError::InvalidArgument(_))));
}

#[test]
fn predictor_scores_and_ranks_candidates() {
    let device = Default::default();
    let predictor =
        WordPredictor::<TestBackend, _>::new(TinyLm::init(&device), tokenizer(), device);

    let predictions = predictor.predict_mask("the <mask> sat", None, 3).unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions[0].score >= predictions[1].score);
    assert!(predictions[1].score >= predictions[2].score);

    let targets = vec!["cat".to_string(), "dog".to_string()];
    let targeted = predictor
        .predict_mask("the <mask> sat", Some(&targets), 10)
        .unwrap();
    assert_eq!(targeted.len(), 2);
    for prediction in &targeted {
        assert!(targets.contains(&prediction.token));
    }
}
