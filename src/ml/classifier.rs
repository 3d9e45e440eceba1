// ============================================================
// Layer 5 — Sequence Classifier
// ============================================================
// Wraps the encoder with a task head for binary classification:
//
//   tokens → TransformerEncoder → mean over positions
//          → Linear(d_model → 1) → sigmoid → P(label = 1)
//
// Loss is Burn's binary cross-entropy on the probabilities; it
// clamps each log term at -100 so saturated outputs stay finite.

use burn::{
    nn::{loss::BinaryCrossEntropyLossConfig, Linear},
    prelude::*,
    tensor::activation::sigmoid,
};
use rand::Rng;

use crate::domain::error::EncoderError;
use crate::ml::{
    encoder::{TransformerEncoder, TransformerEncoderConfig},
    init::seeded_linear,
};

#[derive(Module, Debug)]
pub struct SequenceClassifier<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub head:    Linear<B>,
}

impl<B: Backend> SequenceClassifier<B> {
    pub fn new<R: Rng + ?Sized>(
        encoder_cfg: &TransformerEncoderConfig,
        rng:         &mut R,
        device:      &B::Device,
    ) -> Result<Self, EncoderError> {
        let encoder = encoder_cfg.init(rng, device)?;
        let head    = seeded_linear(encoder_cfg.d_model, 1, rng, device);
        Ok(Self { encoder, head })
    }

    /// tokens: [batch, seq_len] → probabilities [batch, 1]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Result<Tensor<B, 2>, EncoderError> {
        let hidden = self.encoder.encode(tokens, None)?.hidden;
        let [batch, _, d_model] = hidden.dims();
        let pooled = hidden.mean_dim(1).reshape([batch, d_model]);
        Ok(sigmoid(self.head.forward(pooled)))
    }
}

/// Mean binary cross-entropy between probabilities and 0/1 targets.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let bce = BinaryCrossEntropyLossConfig::new().init(&probs.device());
    bce.forward(probs, targets.int())
}

/// Count of predictions on the right side of 0.5.
pub fn correct_predictions<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> usize {
    let predicted = probs.greater_equal_elem(0.5).float();
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}
