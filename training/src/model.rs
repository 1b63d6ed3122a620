//! Capability traits the underlying models implement, one per task.
//!
//! Model architectures live outside this repository. A facade accepts any
//! burn module that implements the matching trait here together with burn's
//! `TrainStep`/`InferenceStep` over the task's batch type; everything else
//! (optimizers, checkpointing, data movement) is handled by the dispatch.

use blithe_config::GenerationSettings;
use blithe_data::batcher::{CausalTrainingBatch, MaskedLmBatch, Seq2SeqBatch, SequenceBatch};
use burn::prelude::*;
use burn::train::ClassificationOutput;

/// A decoder-only language model trained with the standard next-token loss.
pub trait CausalLm<B: Backend>: Module<B> {
    fn forward_training(&self, batch: CausalTrainingBatch<B>) -> ClassificationOutput<B>;

    /// Continue `tokens` by up to `settings.max_new_tokens`, returning the
    /// full sequence including the prompt.
    fn generate(
        &self,
        tokens: Tensor<B, 2, Int>,
        settings: &GenerationSettings,
    ) -> Tensor<B, 2, Int>;
}

/// A masked language model predicting original tokens at masked positions.
pub trait MaskedLm<B: Backend>: Module<B> {
    fn forward_training(&self, batch: MaskedLmBatch<B>) -> ClassificationOutput<B>;

    /// Vocabulary logits for every position: `[batch, seq, vocab]`.
    fn forward_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        mask_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3>;
}

/// An encoder-decoder model trained on source/target pairs.
pub trait Seq2SeqLm<B: Backend>: Module<B> {
    fn forward_training(&self, batch: Seq2SeqBatch<B>) -> ClassificationOutput<B>;

    /// Generate a target sequence for `source`, returning target token ids.
    fn generate(
        &self,
        source: Tensor<B, 2, Int>,
        source_mask: Tensor<B, 2, Bool>,
        settings: &GenerationSettings,
    ) -> Tensor<B, 2, Int>;
}

/// A sequence classifier over single texts or joined pairs.
pub trait SequenceClassifier<B: Backend>: Module<B> {
    fn forward_training(&self, batch: SequenceBatch<B>) -> ClassificationOutput<B>;

    /// Class logits: `[batch, num_classes]`.
    fn forward_logits(
        &self,
        tokens: Tensor<B, 2, Int>,
        mask_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 2>;
}
