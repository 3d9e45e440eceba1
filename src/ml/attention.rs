// ============================================================
// Layer 5 — Scaled Dot-Product Attention
// ============================================================
// For one batch of head-groups:
//
//   scores  = Q · Kᵀ / sqrt(d_k)          [batch, heads, seq_q, seq_k]
//   scores  = mask(scores, valid_lens)    key positions >= L → -1e6
//   weights = softmax(scores, key axis)
//   context = weights · V                 [batch, heads, seq_q, d_v]
//
// Masking uses a large finite negative value rather than -inf.
// A row whose valid length is 0 therefore has every score equal
// to -1e6 and softmaxes to uniform weights 1/seq_k: no NaN can
// leak into the outputs.
//
// Reference: Vaswani et al. (2017) §3.2.1
//            Dive into Deep Learning §11.3 (masked softmax)

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::{error::EncoderError, traits::Layer};

/// Fill value for masked-out scores.
pub const MASK_VALUE: f32 = -1.0e6;

// ─── ValidLens ────────────────────────────────────────────────────────────────
/// Count of non-padding key positions.
#[derive(Debug, Clone)]
pub enum ValidLens<B: Backend> {
    /// One length per batch element, shape [batch]
    PerSequence(Tensor<B, 1, Int>),
    /// One length per (batch element, query row), shape [batch, seq_q]
    PerQuery(Tensor<B, 2, Int>),
}

impl<B: Backend> ValidLens<B> {
    /// Per-sequence lengths from host values. Lengths beyond `i32::MAX`
    /// saturate, which still leaves every key visible.
    pub fn from_lengths(lengths: &[usize], device: &B::Device) -> Self {
        let ints: Vec<i32> = lengths
            .iter()
            .map(|&l| i32::try_from(l).unwrap_or(i32::MAX))
            .collect();
        Self::PerSequence(Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device))
    }

    /// Boolean mask, `true` where the key position must be hidden.
    /// Output shape [batch, heads, seq_q, seq_k].
    pub fn key_mask(
        &self,
        [batch, heads, seq_q, seq_k]: [usize; 4],
    ) -> Result<Tensor<B, 4, Bool>, EncoderError> {
        let (lens, device) = match self {
            Self::PerSequence(lens) => {
                let dims = lens.dims();
                if dims != [batch] {
                    return Err(EncoderError::shape("valid_lens", format!("[{batch}]"), &dims));
                }
                (lens.clone().reshape([batch, 1, 1, 1]), lens.device())
            }
            Self::PerQuery(lens) => {
                let dims = lens.dims();
                if dims != [batch, seq_q] {
                    return Err(EncoderError::shape(
                        "valid_lens",
                        format!("[{batch}, {seq_q}]"),
                        &dims,
                    ));
                }
                (lens.clone().reshape([batch, 1, seq_q, 1]), lens.device())
            }
        };
        let positions = Tensor::<B, 1, Int>::arange(0..seq_k as i64, &device)
            .reshape([1, 1, 1, seq_k])
            .expand([batch, heads, seq_q, seq_k]);
        let lens = lens.expand([batch, heads, seq_q, seq_k]);
        Ok(positions.greater_equal(lens))
    }
}

/// Softmax over the key axis with key positions `>= valid_len` hidden.
///
/// `scores`: [batch, heads, seq_q, seq_k]. Without lengths this is a
/// plain softmax.
pub fn masked_softmax<B: Backend>(
    scores:     Tensor<B, 4>,
    valid_lens: Option<&ValidLens<B>>,
) -> Result<Tensor<B, 4>, EncoderError> {
    let scores = match valid_lens {
        Some(lens) => {
            let mask = lens.key_mask(scores.dims())?;
            scores.mask_fill(mask, MASK_VALUE)
        }
        None => scores,
    };
    Ok(softmax(scores, 3))
}

// ─── AttentionInput ───────────────────────────────────────────────────────────
/// Queries, keys, values and optional valid lengths for one attention call.
#[derive(Debug, Clone)]
pub struct AttentionInput<B: Backend, const D: usize> {
    pub queries:    Tensor<B, D>,
    pub keys:       Tensor<B, D>,
    pub values:     Tensor<B, D>,
    pub valid_lens: Option<ValidLens<B>>,
}

impl<B: Backend, const D: usize> AttentionInput<B, D> {
    pub fn new(queries: Tensor<B, D>, keys: Tensor<B, D>, values: Tensor<B, D>) -> Self {
        Self { queries, keys, values, valid_lens: None }
    }

    /// Self-attention: the same tensor plays Q, K and V.
    pub fn self_attn(x: Tensor<B, D>) -> Self {
        Self::new(x.clone(), x.clone(), x)
    }

    pub fn with_valid_lens(mut self, valid_lens: Option<ValidLens<B>>) -> Self {
        self.valid_lens = valid_lens;
        self
    }
}

// ─── AttentionOutput ──────────────────────────────────────────────────────────
/// Attended values plus the weights that produced them.
#[derive(Debug, Clone)]
pub struct AttentionOutput<B: Backend, const D: usize> {
    /// [batch, heads, seq_q, d_v] per head-group, or [batch, seq_q, d_model]
    /// after heads are merged
    pub context: Tensor<B, D>,
    /// [batch, heads, seq_q, seq_k]
    pub weights: Tensor<B, 4>,
}

// ─── DotProductAttention ──────────────────────────────────────────────────────
#[derive(Module, Clone, Debug)]
pub struct DotProductAttention {
    dropout: Dropout,
}

impl DotProductAttention {
    pub fn new(dropout: f64) -> Self {
        Self { dropout: DropoutConfig::new(dropout).init() }
    }

    /// Run attention on head-split tensors:
    /// Q [b, h, sq, dk], K [b, h, sk, dk], V [b, h, sk, dv].
    pub fn attend<B: Backend>(
        &self,
        input: AttentionInput<B, 4>,
    ) -> Result<AttentionOutput<B, 4>, EncoderError> {
        let AttentionInput { queries, keys, values, valid_lens } = input;
        let [batch, heads, seq_q, d_k] = queries.dims();
        let key_dims   = keys.dims();
        let value_dims = values.dims();

        if key_dims[0] != batch || key_dims[1] != heads || key_dims[3] != d_k {
            return Err(EncoderError::shape(
                "keys",
                format!("[{batch}, {heads}, seq_k, {d_k}]"),
                &key_dims,
            ));
        }
        let seq_k = key_dims[2];
        if value_dims[0] != batch || value_dims[1] != heads || value_dims[2] != seq_k {
            return Err(EncoderError::shape(
                "values",
                format!("[{batch}, {heads}, {seq_k}, d_v]"),
                &value_dims,
            ));
        }

        let scores  = queries.matmul(keys.swap_dims(2, 3)) / (d_k as f64).sqrt();
        let weights = masked_softmax(scores, valid_lens.as_ref())?;
        let context = self.dropout.forward(weights.clone()).matmul(values);

        tracing::trace!(batch, heads, seq_q, seq_k, "dot-product attention");
        Ok(AttentionOutput { context, weights })
    }
}

impl<B: Backend> Layer<AttentionInput<B, 4>> for DotProductAttention {
    type Output = AttentionOutput<B, 4>;

    fn forward(&self, input: AttentionInput<B, 4>) -> Result<Self::Output, EncoderError> {
        self.attend(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ramp(dims: [usize; 4], scale: f32) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        let count: usize = dims.iter().product();
        let values: Vec<f32> = (0..count).map(|i| ((i % 7) as f32 - 3.0) * scale).collect();
        Tensor::from_data(burn::tensor::TensorData::new(values, dims), &device)
    }

    fn row_sums(weights: Tensor<TestBackend, 4>) -> Vec<f32> {
        weights.sum_dim(3).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_output_and_weight_shapes() {
        let attn = DotProductAttention::new(0.0);
        let out = attn
            .attend(AttentionInput::new(
                ramp([2, 4, 3, 8], 0.1),
                ramp([2, 4, 5, 8], 0.1),
                ramp([2, 4, 5, 6], 0.1),
            ))
            .unwrap();
        assert_eq!(out.context.dims(), [2, 4, 3, 6]);
        assert_eq!(out.weights.dims(), [2, 4, 3, 5]);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let attn = DotProductAttention::new(0.0);
        let x = ramp([2, 2, 4, 4], 0.3);
        let out = attn.attend(AttentionInput::self_attn(x)).unwrap();
        for s in row_sums(out.weights) {
            assert!((s - 1.0).abs() < 1e-5, "row sum {s}");
        }
    }

    #[test]
    fn test_masked_keys_get_zero_weight() {
        let device = Default::default();
        let attn = DotProductAttention::new(0.0);
        let x = ramp([2, 2, 4, 4], 0.3);
        let lens = ValidLens::<TestBackend>::from_lengths(&[4, 2], &device);
        let out = attn
            .attend(AttentionInput::self_attn(x).with_valid_lens(Some(lens)))
            .unwrap();
        let w = out.weights.into_data().to_vec::<f32>().unwrap();
        // second batch element: keys 2 and 3 are padding
        for head in 0..2 {
            for q in 0..4 {
                let base = ((2 + head) * 4 + q) * 4;
                assert!(w[base + 2] < 1e-6);
                assert!(w[base + 3] < 1e-6);
                assert!((w[base] + w[base + 1] - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_zero_length_falls_back_to_uniform() {
        let device = Default::default();
        let scores = ramp([1, 1, 2, 4], 1.0);
        let lens = ValidLens::<TestBackend>::from_lengths(&[0], &device);
        let w = masked_softmax(scores, Some(&lens)).unwrap();
        let values = w.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
        assert!(values.iter().all(|v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_huge_lengths_mask_nothing() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 1.0, 2.0, 3.0]]]], &device);
        let expected = masked_softmax(scores.clone(), None)
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(expected[3] > 0.6);

        for len in [(u32::MAX as usize).saturating_add(1), i32::MAX as usize + 1, usize::MAX] {
            let lens = ValidLens::<TestBackend>::from_lengths(&[len], &device);
            let w = masked_softmax(scores.clone(), Some(&lens))
                .unwrap()
                .into_data()
                .to_vec::<f32>()
                .unwrap();
            for (a, b) in w.iter().zip(&expected) {
                assert!((a - b).abs() < 1e-6, "length {len}: {w:?}");
            }
        }
    }

    #[test]
    fn test_per_query_lengths() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 3], &device);
        let lens = ValidLens::PerQuery(Tensor::<TestBackend, 2, Int>::from_ints([[1, 3]], &device));
        let w = masked_softmax(scores, Some(&lens)).unwrap();
        let values = w.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!(values[1] < 1e-6 && values[2] < 1e-6);
        for v in &values[3..] {
            assert!((v - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_without_lengths_nothing_is_masked() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 4>::zeros([1, 1, 1, 4], &device);
        let w = masked_softmax(scores, None).unwrap();
        let values = w.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.25; 4]);
    }

    #[test]
    fn test_rejects_wrong_batch_of_lengths() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 4>::zeros([2, 1, 3, 3], &device);
        let lens = ValidLens::<TestBackend>::from_lengths(&[3], &device);
        assert!(matches!(
            masked_softmax(scores, Some(&lens)),
            Err(EncoderError::ShapeMismatch { what: "valid_lens", .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_key_width() {
        let attn = DotProductAttention::new(0.0);
        let result = attn.attend(AttentionInput::new(
            ramp([1, 2, 3, 8], 0.1),
            ramp([1, 2, 3, 4], 0.1),
            ramp([1, 2, 3, 4], 0.1),
        ));
        assert!(matches!(result, Err(EncoderError::ShapeMismatch { what: "keys", .. })));
    }
}
