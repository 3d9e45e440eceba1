// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Splits d_model into `num_heads` independent subspaces of
// width d_k = d_model / num_heads and attends in all of them
// at once:
//
//   Q, K, V          [batch, seq, d_model]
//     │ W_q, W_k, W_v (Linear d_model → d_model)
//     ▼
//   split heads      [batch, heads, seq, d_k]
//     │ DotProductAttention (one batched op over every head)
//     ▼
//   merge heads      [batch, seq_q, d_model]
//     │ W_o (Linear d_model → d_model)
//     ▼
//   output           [batch, seq_q, d_model]  + weights [batch, heads, seq_q, seq_k]
//
// Reference: Vaswani et al. (2017) §3.2.2

use burn::{nn::Linear, prelude::*};
use rand::Rng;

use crate::domain::{error::EncoderError, traits::Layer};
use crate::ml::{
    attention::{AttentionInput, AttentionOutput, DotProductAttention},
    init::seeded_linear,
};

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
}

impl MultiHeadAttentionConfig {
    /// Fails when the heads cannot partition d_model evenly.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        rng:    &mut R,
        device: &B::Device,
    ) -> Result<MultiHeadAttention<B>, EncoderError> {
        if self.d_model == 0 || self.num_heads == 0 {
            return Err(EncoderError::InvalidConfig(format!(
                "d_model ({}) and num_heads ({}) must be positive",
                self.d_model, self.num_heads
            )));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(EncoderError::HeadsDoNotDivide {
                d_model:   self.d_model,
                num_heads: self.num_heads,
            });
        }
        Ok(MultiHeadAttention {
            query:     seeded_linear(self.d_model, self.d_model, rng, device),
            key:       seeded_linear(self.d_model, self.d_model, rng, device),
            value:     seeded_linear(self.d_model, self.d_model, rng, device),
            output:    seeded_linear(self.d_model, self.d_model, rng, device),
            attention: DotProductAttention::new(self.dropout),
            d_model:   self.d_model,
            num_heads: self.num_heads,
        })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub query:     Linear<B>,
    pub key:       Linear<B>,
    pub value:     Linear<B>,
    pub output:    Linear<B>,
    pub attention: DotProductAttention,
    pub d_model:   usize,
    pub num_heads: usize,
}

impl<B: Backend> MultiHeadAttention<B> {
    pub fn head_dim(&self) -> usize {
        self.d_model / self.num_heads
    }

    /// [batch, seq, d_model] → [batch, heads, seq, d_k]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq, _] = x.dims();
        x.reshape([batch, seq, self.num_heads, self.head_dim()])
            .swap_dims(1, 2)
    }

    /// [batch, heads, seq, d_k] → [batch, seq, d_model]
    fn merge_heads(&self, x: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch, _, seq, _] = x.dims();
        x.swap_dims(1, 2).reshape([batch, seq, self.d_model])
    }

    /// Queries, keys and values must agree on batch and channel width;
    /// keys and values must also agree on length.
    fn check_shapes(&self, input: &AttentionInput<B, 3>) -> Result<(), EncoderError> {
        let [batch, _, width] = input.queries.dims();
        if width != self.d_model {
            return Err(EncoderError::shape(
                "queries",
                format!("[batch, seq_q, {}]", self.d_model),
                &input.queries.dims(),
            ));
        }
        let [key_batch, seq_k, key_width] = input.keys.dims();
        if key_batch != batch || key_width != self.d_model {
            return Err(EncoderError::shape(
                "keys",
                format!("[{batch}, seq_k, {}]", self.d_model),
                &input.keys.dims(),
            ));
        }
        if input.values.dims() != [batch, seq_k, self.d_model] {
            return Err(EncoderError::shape(
                "values",
                format!("[{batch}, {seq_k}, {}]", self.d_model),
                &input.values.dims(),
            ));
        }
        Ok(())
    }
}

impl<B: Backend> Layer<AttentionInput<B, 3>> for MultiHeadAttention<B> {
    type Output = AttentionOutput<B, 3>;

    fn forward(&self, input: AttentionInput<B, 3>) -> Result<Self::Output, EncoderError> {
        self.check_shapes(&input)?;
        let AttentionInput { queries, keys, values, valid_lens } = input;

        let heads = AttentionInput::new(
            self.split_heads(self.query.forward(queries)),
            self.split_heads(self.key.forward(keys)),
            self.split_heads(self.value.forward(values)),
        )
        .with_valid_lens(valid_lens);

        let AttentionOutput { context, weights } = self.attention.attend(heads)?;
        let context = self.output.forward(self.merge_heads(context));
        Ok(AttentionOutput { context, weights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::attention::ValidLens;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray;

    fn mha(d_model: usize, num_heads: usize) -> MultiHeadAttention<TestBackend> {
        MultiHeadAttentionConfig::new(d_model, num_heads)
            .with_dropout(0.0)
            .init(&mut StdRng::seed_from_u64(3), &Default::default())
            .unwrap()
    }

    fn input(dims: [usize; 3]) -> Tensor<TestBackend, 3> {
        let mut rng = StdRng::seed_from_u64(11);
        crate::ml::init::uniform_tensor(dims, 1.0, &mut rng, &Default::default())
    }

    #[test]
    fn test_shapes() {
        let layer = mha(16, 4);
        let out = layer.forward(AttentionInput::self_attn(input([2, 3, 16]))).unwrap();
        assert_eq!(out.context.dims(), [2, 3, 16]);
        assert_eq!(out.weights.dims(), [2, 4, 3, 3]);
    }

    #[test]
    fn test_cross_attention_lengths() {
        let layer = mha(16, 2);
        let kv = input([2, 5, 16]);
        let out = layer
            .forward(AttentionInput::new(input([2, 3, 16]), kv.clone(), kv))
            .unwrap();
        assert_eq!(out.context.dims(), [2, 3, 16]);
        assert_eq!(out.weights.dims(), [2, 2, 3, 5]);
    }

    #[test]
    fn test_split_then_merge_is_identity() {
        let layer = mha(8, 2);
        let x = input([2, 3, 8]);
        let back = layer.merge_heads(layer.split_heads(x.clone()));
        assert_eq!(
            back.into_data().to_vec::<f32>().unwrap(),
            x.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_heads_must_divide_width() {
        let result = MultiHeadAttentionConfig::new(10, 3)
            .init::<TestBackend, _>(&mut StdRng::seed_from_u64(0), &Default::default());
        assert_eq!(
            result.unwrap_err(),
            EncoderError::HeadsDoNotDivide { d_model: 10, num_heads: 3 }
        );
    }

    #[test]
    fn test_zero_heads_rejected() {
        let result = MultiHeadAttentionConfig::new(8, 0)
            .init::<TestBackend, _>(&mut StdRng::seed_from_u64(0), &Default::default());
        assert!(matches!(result, Err(EncoderError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inconsistent_batches() {
        let layer = mha(16, 4);
        let result = layer.forward(AttentionInput::new(
            input([2, 3, 16]),
            input([1, 3, 16]),
            input([1, 3, 16]),
        ));
        assert!(matches!(result, Err(EncoderError::ShapeMismatch { what: "keys", .. })));
    }

    #[test]
    fn test_rejects_wrong_channel_width() {
        let layer = mha(16, 4);
        let result = layer.forward(AttentionInput::self_attn(input([2, 3, 12])));
        assert!(matches!(result, Err(EncoderError::ShapeMismatch { what: "queries", .. })));
    }

    #[test]
    fn test_masking_reaches_every_head() {
        let device = Default::default();
        let layer = mha(16, 4);
        let lens = ValidLens::<TestBackend>::from_lengths(&[3, 1], &device);
        let out = layer
            .forward(AttentionInput::self_attn(input([2, 3, 16])).with_valid_lens(Some(lens)))
            .unwrap();
        let w = out.weights.into_data().to_vec::<f32>().unwrap();
        // batch 1 only sees key 0
        for head in 0..4 {
            for q in 0..3 {
                let base = ((4 + head) * 3 + q) * 3;
                assert!((w[base] - 1.0).abs() < 1e-5);
            }
        }
    }
}
