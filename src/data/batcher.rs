// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Converts plain-Rust token rows into backend tensors.
//
//   Input:  N LabeledSequences, each with seq_len tokens
//   Output: ClassificationBatch with
//             tokens [N, seq_len]  (Int)
//             labels [N, 1]        (Float, 0.0 / 1.0)
//
// All rows are flattened into one Vec first, then reshaped:
//   [s1_t1, s1_t2, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::domain::{
    error::EncoderError,
    sequence::{LabeledSequence, TokenBatch},
};

// ─── ClassificationBatch ──────────────────────────────────────────────────────
/// A batch of labelled sequences ready for the classifier.
#[derive(Debug, Clone)]
pub struct ClassificationBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub tokens: Tensor<B, 2, Int>,

    /// Binary targets — shape: [batch_size, 1]
    pub labels: Tensor<B, 2>,
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created in the right place.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// [batch, seq_len] Int tensor from an already validated TokenBatch.
    pub fn tokens(&self, batch: &TokenBatch) -> Tensor<B, 2, Int> {
        let [rows, seq_len] = batch.dims();
        Tensor::<B, 1, Int>::from_ints(batch.flat_ids().as_slice(), &self.device)
            .reshape([rows, seq_len])
    }

    /// Stack labelled samples; every row must have the same length.
    pub fn batch(&self, items: &[LabeledSequence]) -> Result<ClassificationBatch<B>, EncoderError> {
        let rows = TokenBatch::new(items.iter().map(|s| s.tokens.clone()).collect())?;
        let labels: Vec<f32> = items
            .iter()
            .map(|s| if s.is_positive() { 1.0 } else { 0.0 })
            .collect();

        let tokens = self.tokens(&rows);
        let labels = Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device)
            .reshape([items.len(), 1]);

        Ok(ClassificationBatch { tokens, labels })
    }
}
