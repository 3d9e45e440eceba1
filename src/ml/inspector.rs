// ============================================================
// Layer 5 — Encoder Inspector
// ============================================================
// Builds an encoder from a config + seed, runs one batch of
// token ids through it, and summarises every intermediate
// shape plus the attention weights of each block:
//
//   - weight tensor shape
//   - smallest / largest row sum over the key axis (≈ 1.0)
//   - largest weight that landed on a padding key (≈ 0.0)
//   - the [seq_q, seq_k] matrix for batch 0, head 0
//
// Runs on the NdArray backend; nothing is trained.

use anyhow::{anyhow, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::batcher::SequenceBatcher;
use crate::domain::sequence::TokenBatch;
use crate::ml::{
    attention::ValidLens,
    encoder::TransformerEncoderConfig,
};

type InspectBackend = NdArray;

/// Per-block attention summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSummary {
    pub weight_shape:       Vec<usize>,
    pub min_row_sum:        f32,
    pub max_row_sum:        f32,
    /// None when no valid lengths were supplied
    pub max_padding_weight: Option<f32>,
    /// Batch 0, head 0, as rows of query positions
    pub head0:              Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReport {
    pub embedded_shape: Vec<usize>,
    pub encoded_shape:  Vec<usize>,
    pub output_shape:   Vec<usize>,
    pub output_l2_norm: f32,
    pub blocks:         Vec<BlockSummary>,
}

pub fn inspect(
    encoder_cfg: &TransformerEncoderConfig,
    tokens:      &TokenBatch,
    valid_lens:  Option<&[usize]>,
    seed:        u64,
) -> Result<InspectReport> {
    let device  = NdArrayDevice::default();
    let encoder = encoder_cfg.init::<InspectBackend, _>(&mut StdRng::seed_from_u64(seed), &device)?;
    let ids     = SequenceBatcher::<InspectBackend>::new(device.clone()).tokens(tokens);

    if let Some(lens) = valid_lens {
        for (i, len) in lens.iter().enumerate().filter(|(_, l)| **l == 0) {
            tracing::warn!("batch element {} has valid length {}; its attention is uniform", i, len);
        }
    }

    let embedded = encoder.embed(ids.clone())?;
    let encoded  = encoder.positional_encode(embedded.clone())?;
    let lens     = valid_lens.map(|l| ValidLens::<InspectBackend>::from_lengths(l, &device));
    let output   = encoder.encode(ids, lens)?;

    let output_shape   = output.hidden.dims().to_vec();
    let output_l2_norm = host(output.hidden)?.iter().map(|v| v * v).sum::<f32>().sqrt();

    let blocks = output
        .attention_weights
        .into_iter()
        .map(|w| summarise(w, valid_lens))
        .collect::<Result<Vec<_>>>()?;

    Ok(InspectReport {
        embedded_shape: embedded.dims().to_vec(),
        encoded_shape:  encoded.dims().to_vec(),
        output_shape,
        output_l2_norm,
        blocks,
    })
}

fn summarise(weights: Tensor<InspectBackend, 4>, valid_lens: Option<&[usize]>) -> Result<BlockSummary> {
    let [batch, heads, seq_q, seq_k] = weights.dims();
    let row_sums = host(weights.clone().sum_dim(3))?;
    let values   = host(weights)?;

    let min_row_sum = row_sums.iter().copied().fold(f32::INFINITY, f32::min);
    let max_row_sum = row_sums.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    // Rows of a zero-length sequence are uniform by construction, skip them
    let max_padding_weight = valid_lens.map(|lens| {
        let mut worst = 0.0f32;
        for (b, &len) in lens.iter().enumerate().take(batch).filter(|(_, l)| **l > 0) {
            for row in values[b * heads * seq_q * seq_k..(b + 1) * heads * seq_q * seq_k].chunks(seq_k) {
                for &w in row.iter().skip(len) {
                    worst = worst.max(w);
                }
            }
        }
        worst
    });

    let head0 = values[..seq_q * seq_k]
        .chunks(seq_k)
        .map(<[f32]>::to_vec)
        .collect();

    Ok(BlockSummary {
        weight_shape: vec![batch, heads, seq_q, seq_k],
        min_row_sum,
        max_row_sum,
        max_padding_weight,
        head0,
    })
}

fn host<const D: usize>(t: Tensor<InspectBackend, D>) -> Result<Vec<f32>> {
    t.into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read tensor data: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> TransformerEncoderConfig {
        TransformerEncoderConfig::new(1000, 50)
            .with_d_model(128)
            .with_num_heads(4)
            .with_n_blocks(2)
            .with_d_ff(256)
            .with_dropout(0.0)
    }

    #[test]
    fn test_report_for_reference_batch() {
        let tokens: TokenBatch = "1,2,3;4,5,6".parse().unwrap();
        let report = inspect(&cfg(), &tokens, Some(&[3, 2]), 42).unwrap();

        assert_eq!(report.embedded_shape, vec![2, 3, 128]);
        assert_eq!(report.encoded_shape, vec![2, 3, 128]);
        assert_eq!(report.output_shape, vec![2, 3, 128]);
        assert!(report.output_l2_norm > 0.0);
        assert_eq!(report.blocks.len(), 2);
        for block in &report.blocks {
            assert_eq!(block.weight_shape, vec![2, 4, 3, 3]);
            assert!((block.min_row_sum - 1.0).abs() < 1e-5);
            assert!((block.max_row_sum - 1.0).abs() < 1e-5);
            assert!(block.max_padding_weight.unwrap() < 1e-6);
            assert_eq!(block.head0.len(), 3);
            assert_eq!(block.head0[0].len(), 3);
        }
    }

    #[test]
    fn test_without_lengths_no_padding_summary() {
        let tokens: TokenBatch = "7,8".parse().unwrap();
        let report = inspect(&cfg(), &tokens, None, 1).unwrap();
        assert!(report.blocks.iter().all(|b| b.max_padding_weight.is_none()));
    }

    #[test]
    fn test_out_of_vocab_error_reports_typed_id() {
        let tokens: TokenBatch = "1,3000000000".parse().unwrap();
        let err = inspect(&cfg(), &tokens, None, 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::domain::error::EncoderError>(),
            Some(&crate::domain::error::EncoderError::TokenOutOfRange {
                id:         3_000_000_000,
                vocab_size: 1000,
            })
        );
    }

    #[test]
    fn test_config_errors_surface() {
        let tokens: TokenBatch = "1,2".parse().unwrap();
        let bad = cfg().with_num_heads(3);
        let err = inspect(&bad, &tokens, None, 0).unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }
}
