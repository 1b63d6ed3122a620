//! Batchers that collate tokenized examples into padded tensors.
//!
//! Padding uses the pad token id, which doubles as the loss-ignore sentinel:
//! the trainer configures its cross-entropy loss to skip pad targets.

use burn::{
    data::dataloader::batcher::Batcher, nn::attention::generate_padding_mask, prelude::*,
};
use rand::Rng;

use crate::encode::{CausalExample, MaskedExample, Seq2SeqExample, SequenceExample};

#[derive(Clone, Debug)]
pub struct CausalTrainingBatch<B: Backend> {
    pub tokens_inputs: Tensor<B, 2, Int>,
    pub targets: Tensor<B, 2, Int>,
    pub mask_pad: Tensor<B, 2, Bool>,
}

#[derive(Clone, Debug)]
pub struct MaskedLmBatch<B: Backend> {
    pub tokens_inputs: Tensor<B, 2, Int>,
    pub targets: Tensor<B, 2, Int>,
    pub mask_pad: Tensor<B, 2, Bool>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatch<B: Backend> {
    pub source_tokens: Tensor<B, 2, Int>,
    pub source_mask: Tensor<B, 2, Bool>,
    pub target_tokens: Tensor<B, 2, Int>,
    pub target_mask: Tensor<B, 2, Bool>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatch<B: Backend> {
    pub tokens: Tensor<B, 2, Int>,
    pub mask_pad: Tensor<B, 2, Bool>,
    pub labels: Tensor<B, 1, Int>,
}

fn to_usize_lists(items: Vec<Vec<u32>>) -> Vec<Vec<usize>> {
    items
        .into_iter()
        .map(|tokens| tokens.into_iter().map(|t| t as usize).collect())
        .collect()
}

/// Causal-LM batcher: pads a batch of blocks and applies the next-token
/// shift (inputs `0..n-1`, targets `1..n`).
#[derive(Clone)]
pub struct CausalBatcher {
    pad_token: usize,
    max_length: usize,
}

impl CausalBatcher {
    #[must_use]
    pub fn new(pad_token: usize, max_length: usize) -> Self {
        Self {
            pad_token,
            max_length,
        }
    }
}

impl<B: Backend> Batcher<B, CausalExample, CausalTrainingBatch<B>> for CausalBatcher {
    fn batch(&self, items: Vec<CausalExample>, device: &B::Device) -> CausalTrainingBatch<B> {
        let tokens_list = to_usize_lists(items.into_iter().map(|item| item.tokens).collect());
        let mask =
            generate_padding_mask(self.pad_token, tokens_list, Some(self.max_length), device);

        let [batch_size, seq_length] = mask.tensor.dims();
        let tokens_inputs = mask
            .tensor
            .clone()
            .slice([0..batch_size, 0..seq_length - 1]);
        let targets = mask.tensor.slice([0..batch_size, 1..seq_length]);
        let mask_pad = mask.mask.slice([0..batch_size, 0..seq_length - 1]);

        CausalTrainingBatch {
            tokens_inputs,
            targets,
            mask_pad,
        }
    }
}

/// Select positions for masking with the configured probability. Selected
/// tokens are replaced by the mask token and their original ids become the
/// labels; every other label position holds the pad (ignore) sentinel. Pad
/// positions are never selected.
pub fn mask_tokens<R: Rng>(
    tokens: &mut [usize],
    labels: &mut [usize],
    mask_token: usize,
    pad_token: usize,
    probability: f32,
    rng: &mut R,
) {
    for (token, label) in tokens.iter_mut().zip(labels.iter_mut()) {
        *label = pad_token;
        if *token == pad_token {
            continue;
        }
        if rng.r#gen::<f32>() < probability {
            *label = *token;
            *token = mask_token;
        }
    }
}

/// Masked-LM collator. Masking is stochastic and happens here, at batch
/// time, so every epoch sees a fresh masking of the same examples. The
/// probability is injected by the trainer dispatch just before the run.
#[derive(Clone)]
pub struct MaskedLmBatcher {
    pad_token: usize,
    mask_token: usize,
    max_length: usize,
    mlm_probability: f32,
}

impl MaskedLmBatcher {
    #[must_use]
    pub fn new(pad_token: usize, mask_token: usize, max_length: usize) -> Self {
        Self {
            pad_token,
            mask_token,
            max_length,
            mlm_probability: 0.15,
        }
    }

    #[must_use]
    pub fn with_mlm_probability(mut self, mlm_probability: f32) -> Self {
        self.mlm_probability = mlm_probability;
        self
    }
}

impl<B: Backend> Batcher<B, MaskedExample, MaskedLmBatch<B>> for MaskedLmBatcher {
    fn batch(&self, items: Vec<MaskedExample>, device: &B::Device) -> MaskedLmBatch<B> {
        let mut rng = rand::thread_rng();
        let mut inputs_list = Vec::with_capacity(items.len());
        let mut labels_list = Vec::with_capacity(items.len());

        for item in items {
            let mut tokens: Vec<usize> = item.tokens.into_iter().map(|t| t as usize).collect();
            let mut labels = vec![self.pad_token; tokens.len()];
            mask_tokens(
                &mut tokens,
                &mut labels,
                self.mask_token,
                self.pad_token,
                self.mlm_probability,
                &mut rng,
            );
            inputs_list.push(tokens);
            labels_list.push(labels);
        }

        let mask =
            generate_padding_mask(self.pad_token, inputs_list, Some(self.max_length), device);
        let [batch_size, seq_length] = mask.tensor.dims();

        let mut flat_labels: Vec<i32> = Vec::with_capacity(batch_size * seq_length);
        for mut labels in labels_list {
            labels.resize(seq_length, self.pad_token);
            flat_labels.extend(labels.into_iter().map(|label| label as i32));
        }
        let targets = Tensor::<B, 1, Int>::from_ints(flat_labels.as_slice(), device)
            .reshape([batch_size, seq_length]);

        MaskedLmBatch {
            tokens_inputs: mask.tensor,
            targets,
            mask_pad: mask.mask,
        }
    }
}

/// Seq2seq batcher: source and target are padded independently under their
/// own length limits.
#[derive(Clone)]
pub struct Seq2SeqBatcher {
    pad_token: usize,
    max_input_length: usize,
    max_output_length: usize,
}

impl Seq2SeqBatcher {
    #[must_use]
    pub fn new(pad_token: usize, max_input_length: usize, max_output_length: usize) -> Self {
        Self {
            pad_token,
            max_input_length,
            max_output_length,
        }
    }
}

impl<B: Backend> Batcher<B, Seq2SeqExample, Seq2SeqBatch<B>> for Seq2SeqBatcher {
    fn batch(&self, items: Vec<Seq2SeqExample>, device: &B::Device) -> Seq2SeqBatch<B> {
        let mut source_list = Vec::with_capacity(items.len());
        let mut target_list = Vec::with_capacity(items.len());
        for item in items {
            source_list.push(item.source);
            target_list.push(item.target);
        }

        let source = generate_padding_mask(
            self.pad_token,
            to_usize_lists(source_list),
            Some(self.max_input_length),
            device,
        );
        let target = generate_padding_mask(
            self.pad_token,
            to_usize_lists(target_list),
            Some(self.max_output_length),
            device,
        );

        Seq2SeqBatch {
            source_tokens: source.tensor,
            source_mask: source.mask,
            target_tokens: target.tensor,
            target_mask: target.mask,
        }
    }
}

/// Classification batcher: one padded sequence tensor plus a label vector.
#[derive(Clone)]
pub struct SequenceBatcher {
    pad_token: usize,
    max_length: usize,
}

impl SequenceBatcher {
    #[must_use]
    pub fn new(pad_token: usize, max_length: usize) -> Self {
        Self {
            pad_token,
            max_length,
        }
    }
}

impl<B: Backend> Batcher<B, SequenceExample, SequenceBatch<B>> for SequenceBatcher {
    fn batch(&self, items: Vec<SequenceExample>, device: &B::Device) -> SequenceBatch<B> {
        let mut tokens_list = Vec::with_capacity(items.len());
        let mut labels = Vec::with_capacity(items.len());
        for item in items {
            tokens_list.push(item.tokens);
            labels.push(item.label as i32);
        }

        let mask = generate_padding_mask(
            self.pad_token,
            to_usize_lists(tokens_list),
            Some(self.max_length),
            device,
        );

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        SequenceBatch {
            tokens: mask.tensor,
            mask_pad: mask.mask,
            labels,
        }
    }
}
