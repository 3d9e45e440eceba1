// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Self-attention is permutation-invariant, so token order has
// to be injected explicitly. A fixed (non-learned) table is
// added to the embeddings:
//
//   PE[p, 2i]   = sin(p / 10000^(2i / d_model))
//   PE[p, 2i+1] = cos(p / 10000^(2i / d_model))
//
// The table is computed once for `max_len` positions at
// construction and sliced to the actual sequence length on
// every call. It is a constant tensor, not a Param, so the
// optimiser never touches it.
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::TensorData,
};

use crate::domain::{error::EncoderError, traits::Layer};

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// Precomputed signal, shape [max_len, d_model]
    table:   Tensor<B, 2>,
    dropout: Dropout,
    max_len: usize,
    d_model: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    pub fn new(d_model: usize, max_len: usize, dropout: f64, device: &B::Device) -> Self {
        let values = sinusoid_table(d_model, max_len);
        let table  = Tensor::from_data(TensorData::new(values, [max_len, d_model]), device);
        Self {
            table,
            dropout: DropoutConfig::new(dropout).init(),
            max_len,
            d_model,
        }
    }

    /// The first `seq_len` rows of the table, shape [seq_len, d_model].
    pub fn signal(&self, seq_len: usize) -> Result<Tensor<B, 2>, EncoderError> {
        if seq_len > self.max_len {
            return Err(EncoderError::SequenceTooLong { seq_len, max_len: self.max_len });
        }
        Ok(self.table.clone().slice([0..seq_len, 0..self.d_model]))
    }
}

impl<B: Backend> Layer<Tensor<B, 3>> for PositionalEncoding<B> {
    type Output = Tensor<B, 3>;

    /// x: [batch, seq_len, d_model] → same shape, with the signal added
    fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, EncoderError> {
        let [batch, seq_len, d_model] = x.dims();
        if d_model != self.d_model {
            return Err(EncoderError::shape(
                "positional encoding input",
                format!("[batch, seq_len, {}]", self.d_model),
                &[batch, seq_len, d_model],
            ));
        }
        let signal = self
            .signal(seq_len)?
            .unsqueeze::<3>()
            .expand([batch, seq_len, d_model]);
        Ok(self.dropout.forward(x + signal))
    }
}

/// Row-major `[max_len, d_model]` sinusoid values.
///
/// Channel pairs (2i, 2i+1) share the frequency `10000^(-2i/d_model)`;
/// an odd trailing channel only gets its sine.
fn sinusoid_table(d_model: usize, max_len: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    for pos in 0..max_len {
        let row = &mut table[pos * d_model..(pos + 1) * d_model];
        for pair in (0..d_model).step_by(2) {
            let angle = pos as f64 / 10000f64.powf(pair as f64 / d_model as f64);
            row[pair] = angle.sin() as f32;
            if pair + 1 < d_model {
                row[pair + 1] = angle.cos() as f32;
            }
        }
    }
    table
}
