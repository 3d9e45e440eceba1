// ============================================================
// Layer 3 — Token Sequence Domain Types
// ============================================================
// Plain-Rust representations of what flows into the encoder
// before it becomes a tensor:
//
//   TokenBatch       — a rectangular batch of token id rows,
//                      shape (batch, seq_len)
//   LabeledSequence  — one row plus a binary class label,
//                      used by the toy classification run
//
// TokenBatch can be parsed from the CLI notation
//   "1,2,3;4,5,6"  →  [[1, 2, 3], [4, 5, 6]]
// (rows separated by ';', ids by ',').
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use std::str::FromStr;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::domain::error::EncoderError;

// ─── TokenBatch ───────────────────────────────────────────────────────────────
/// A non-empty, rectangular batch of token ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBatch {
    rows: Vec<Vec<u32>>,
}

impl TokenBatch {
    /// Build a batch, rejecting empty or ragged input.
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self, EncoderError> {
        let Some(first) = rows.first() else {
            return Err(EncoderError::shape("token batch", "[batch >= 1, seq_len >= 1]", &[0]));
        };
        let seq_len = first.len();
        if seq_len == 0 {
            return Err(EncoderError::shape(
                "token batch",
                "[batch >= 1, seq_len >= 1]",
                &[rows.len(), 0],
            ));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != seq_len) {
            return Err(EncoderError::shape(
                "token batch row",
                format!("[{seq_len}]"),
                &[bad.len()],
            ));
        }
        Ok(Self { rows })
    }

    /// (batch, seq_len)
    pub fn dims(&self) -> [usize; 2] {
        [self.rows.len(), self.rows[0].len()]
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Row-major flattening, ready for a tensor constructor.
    /// Widened to i64 so every u32 id survives unchanged.
    pub fn flat_ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .flat_map(|r| r.iter().map(|&id| i64::from(id)))
            .collect()
    }
}

impl FromStr for TokenBatch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows = Vec::new();
        for row in s.split(';').map(str::trim).filter(|r| !r.is_empty()) {
            let ids = row
                .split(',')
                .map(str::trim)
                .map(|tok| {
                    tok.parse::<u32>()
                        .with_context(|| format!("'{tok}' is not a token id"))
                })
                .collect::<anyhow::Result<Vec<u32>>>()?;
            rows.push(ids);
        }
        if rows.is_empty() {
            bail!("no token rows in '{s}'");
        }
        Ok(Self::new(rows)?)
    }
}

// ─── LabeledSequence ──────────────────────────────────────────────────────────
/// One classification example: a fixed-length token row and a 0/1 label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSequence {
    pub tokens: Vec<u32>,
    pub label:  u8,
}

impl LabeledSequence {
    pub fn new(tokens: Vec<u32>, label: u8) -> Self {
        Self { tokens, label }
    }

    pub fn is_positive(&self) -> bool {
        self.label != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_cli_notation() {
        let batch: TokenBatch = "1,2,3;4,5,6".parse().unwrap();
        assert_eq!(batch.dims(), [2, 3]);
        assert_eq!(batch.flat_ids(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_large_ids_keep_their_value() {
        let batch: TokenBatch = "3000000000,4294967295".parse().unwrap();
        assert_eq!(batch.flat_ids(), vec![3_000_000_000, 4_294_967_295]);
    }

    #[test]
    fn test_tolerates_whitespace_and_trailing_separator() {
        let batch: TokenBatch = " 7, 8 ; 9,10 ;".parse().unwrap();
        assert_eq!(batch.rows(), &[vec![7, 8], vec![9, 10]]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = TokenBatch::new(vec![vec![1, 2, 3], vec![4, 5]]).unwrap_err();
        assert!(matches!(err, EncoderError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(TokenBatch::new(Vec::new()).is_err());
        assert!(TokenBatch::new(vec![vec![]]).is_err());
        assert!("".parse::<TokenBatch>().is_err());
    }

    #[test]
    fn test_rejects_non_numeric_ids() {
        assert!("1,x,3".parse::<TokenBatch>().is_err());
    }

    #[test]
    fn test_label_polarity() {
        assert!(LabeledSequence::new(vec![1], 1).is_positive());
        assert!(!LabeledSequence::new(vec![1], 0).is_positive());
    }
}
