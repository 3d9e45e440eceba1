// ============================================================
// Layer 5 — Position-wise Feed-Forward Network
// ============================================================
//   FFN(x) = W2 · relu(W1 · x + b1) + b2
//
// d_model → d_ff → d_model, applied to every position on its
// own: Linear acts on the last axis only, so no information
// moves between positions here (that is attention's job).
//
// Reference: Vaswani et al. (2017) §3.3

use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation::relu,
};
use rand::Rng;

use crate::domain::{error::EncoderError, traits::Layer};
use crate::ml::init::seeded_linear;

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub inner:   Linear<B>,
    pub outer:   Linear<B>,
    pub dropout: Dropout,
    pub d_model: usize,
}

impl<B: Backend> FeedForward<B> {
    pub fn new<R: Rng + ?Sized>(
        d_model: usize,
        d_ff:    usize,
        dropout: f64,
        rng:     &mut R,
        device:  &B::Device,
    ) -> Self {
        Self {
            inner:   seeded_linear(d_model, d_ff, rng, device),
            outer:   seeded_linear(d_ff, d_model, rng, device),
            dropout: DropoutConfig::new(dropout).init(),
            d_model,
        }
    }
}

impl<B: Backend> Layer<Tensor<B, 3>> for FeedForward<B> {
    type Output = Tensor<B, 3>;

    fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, EncoderError> {
        let dims = x.dims();
        if dims[2] != self.d_model {
            return Err(EncoderError::shape(
                "feed-forward input",
                format!("[batch, seq, {}]", self.d_model),
                &dims,
            ));
        }
        let hidden = self.dropout.forward(relu(self.inner.forward(x)));
        Ok(self.outer.forward(hidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray;

    fn ffn() -> FeedForward<TestBackend> {
        FeedForward::new(8, 32, 0.0, &mut StdRng::seed_from_u64(5), &Default::default())
    }

    #[test]
    fn test_preserves_shape() {
        let x = Tensor::<TestBackend, 3>::ones([2, 3, 8], &Default::default());
        assert_eq!(ffn().forward(x).unwrap().dims(), [2, 3, 8]);
    }

    #[test]
    fn test_positions_are_independent() {
        // Changing position 1 must leave position 0's output untouched
        let device = Default::default();
        let layer = ffn();
        let mut a: Vec<f32> = (0..16).map(|i| i as f32 * 0.1).collect();
        let x_a = Tensor::<TestBackend, 3>::from_data(TensorData::new(a.clone(), [1, 2, 8]), &device);
        for v in &mut a[8..] {
            *v = -5.0;
        }
        let x_b = Tensor::<TestBackend, 3>::from_data(TensorData::new(a, [1, 2, 8]), &device);

        let out_a = layer.forward(x_a).unwrap().into_data().to_vec::<f32>().unwrap();
        let out_b = layer.forward(x_b).unwrap().into_data().to_vec::<f32>().unwrap();
        for (a, b) in out_a[..8].iter().zip(&out_b[..8]) {
            assert!((a - b).abs() < 1e-6);
        }
        assert_ne!(&out_a[8..], &out_b[8..]);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let x = Tensor::<TestBackend, 3>::ones([2, 3, 4], &Default::default());
        assert!(ffn().forward(x).is_err());
    }
}
