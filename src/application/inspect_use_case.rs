// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Parses the token batch and valid lengths given on the
// command line, checks them against each other, and hands the
// work to the ML-layer inspector.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::sequence::TokenBatch;
use crate::ml::{
    encoder::TransformerEncoderConfig,
    inspector::{inspect, InspectReport},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    /// "1,2,3;4,5,6" notation
    pub tokens:     String,
    /// "3,2" notation, one length per row
    pub valid_lens: Option<String>,
    pub vocab_size: usize,
    pub max_len:    usize,
    pub d_model:    usize,
    pub num_heads:  usize,
    pub n_blocks:   usize,
    pub d_ff:       usize,
    pub dropout:    f64,
    pub seed:       u64,
}

impl InspectConfig {
    pub fn encoder_config(&self) -> TransformerEncoderConfig {
        TransformerEncoderConfig::new(self.vocab_size, self.max_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_n_blocks(self.n_blocks)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }
}

pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let cfg = &self.config;
        let tokens: TokenBatch = cfg
            .tokens
            .parse()
            .with_context(|| format!("Invalid --tokens '{}'", cfg.tokens))?;

        let valid_lens = cfg
            .valid_lens
            .as_deref()
            .map(parse_lengths)
            .transpose()?;
        if let Some(lens) = &valid_lens {
            let [batch, _] = tokens.dims();
            ensure!(
                lens.len() == batch,
                "--valid-lens has {} entries but --tokens has {} rows",
                lens.len(),
                batch
            );
        }

        tracing::info!("Inspecting batch of shape {:?}", tokens.dims());
        inspect(&cfg.encoder_config(), &tokens, valid_lens.as_deref(), cfg.seed)
    }
}

/// "3,2" → [3, 2]
fn parse_lengths(s: &str) -> Result<Vec<usize>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<usize>().with_context(|| format!("'{t}' is not a length")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(valid_lens: Option<&str>) -> InspectConfig {
        InspectConfig {
            tokens:     "1,2,3;4,5,6".to_string(),
            valid_lens: valid_lens.map(str::to_string),
            vocab_size: 100,
            max_len:    8,
            d_model:    16,
            num_heads:  4,
            n_blocks:   2,
            d_ff:       32,
            dropout:    0.0,
            seed:       5,
        }
    }

    #[test]
    fn test_parse_lengths() {
        assert_eq!(parse_lengths("3, 2").unwrap(), vec![3, 2]);
        assert!(parse_lengths("3,x").is_err());
    }

    #[test]
    fn test_execute_reports_each_block() {
        let report = InspectUseCase::new(config(Some("3,2"))).execute().unwrap();
        assert_eq!(report.output_shape, vec![2, 3, 16]);
        assert_eq!(report.blocks.len(), 2);
    }

    #[test]
    fn test_length_count_must_match_rows() {
        let err = InspectUseCase::new(config(Some("3"))).execute().unwrap_err();
        assert!(err.to_string().contains("--valid-lens"));
    }
}
