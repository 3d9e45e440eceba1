// ============================================================
// Layer 5 — Encoder Block
// ============================================================
// One post-norm Transformer encoder layer:
//
//   attn, w = MultiHeadAttention(Q, K, V, valid_lens)
//   x1      = LayerNorm(Q + dropout(attn))
//   x2      = LayerNorm(x1 + dropout(FeedForward(x1)))
//
// Output shape == query shape, which is what lets blocks be
// chained without any glue in between.
//
// Reference: Vaswani et al. (2017) §3.1

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};
use rand::Rng;

use crate::domain::{error::EncoderError, traits::Layer};
use crate::ml::{
    attention::{AttentionInput, AttentionOutput},
    feed_forward::FeedForward,
    multi_head::{MultiHeadAttention, MultiHeadAttentionConfig},
};

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        rng:    &mut R,
        device: &B::Device,
    ) -> Result<EncoderBlock<B>, EncoderError> {
        if self.d_ff == 0 {
            return Err(EncoderError::InvalidConfig("d_ff must be positive".to_string()));
        }
        let attention = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(rng, device)?;
        let feed_forward = FeedForward::new(self.d_model, self.d_ff, self.dropout, rng, device);
        Ok(EncoderBlock {
            attention,
            feed_forward,
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        })
    }
}

/// Hidden state after the block plus the block's attention weights.
#[derive(Debug, Clone)]
pub struct BlockOutput<B: Backend> {
    /// [batch, seq_q, d_model]
    pub hidden:  Tensor<B, 3>,
    /// [batch, heads, seq_q, seq_k]
    pub weights: Tensor<B, 4>,
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub attention:    MultiHeadAttention<B>,
    pub feed_forward: FeedForward<B>,
    pub norm1:        LayerNorm<B>,
    pub norm2:        LayerNorm<B>,
    pub dropout:      Dropout,
}

impl<B: Backend> Layer<AttentionInput<B, 3>> for EncoderBlock<B> {
    type Output = BlockOutput<B>;

    fn forward(&self, input: AttentionInput<B, 3>) -> Result<BlockOutput<B>, EncoderError> {
        let residual = input.queries.clone();
        let AttentionOutput { context, weights } = self.attention.forward(input)?;

        let x = self.norm1.forward(residual + self.dropout.forward(context));
        let ff = self.feed_forward.forward(x.clone())?;
        let hidden = self.norm2.forward(x + self.dropout.forward(ff));

        Ok(BlockOutput { hidden, weights })
    }
}
