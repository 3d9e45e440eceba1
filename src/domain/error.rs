// ============================================================
// Layer 3 — Encoder Error Taxonomy
// ============================================================
// Three families of failure can come out of the encoder:
//
//   1. Configuration errors — bad hyperparameters, raised by
//      TransformerEncoderConfig::validate / init before any
//      weight is allocated.
//   2. Shape errors — a caller handed a forward operation a
//      tensor whose dimensions do not fit. The offending
//      operation refuses to start and reports expected vs.
//      actual shape.
//   3. Input-range errors — token ids outside the vocabulary.
//
// Numeric degeneracy (fully masked attention rows) is NOT an
// error: the attention kernel resolves it to uniform weights.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

/// Every failure the encoder library can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// A hyperparameter is out of range (e.g. zero-sized dimension)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Heads must partition the model width exactly
    #[error("d_model ({d_model}) must be divisible by num_heads ({num_heads})")]
    HeadsDoNotDivide { d_model: usize, num_heads: usize },

    /// A tensor argument has the wrong dimensions
    #[error("{what}: expected shape {expected}, got {actual:?}")]
    ShapeMismatch {
        what:     &'static str,
        expected: String,
        actual:   Vec<usize>,
    },

    /// The positional table only covers `max_len` positions
    #[error("sequence length {seq_len} exceeds max_len {max_len}")]
    SequenceTooLong { seq_len: usize, max_len: usize },

    /// A token id does not index into the embedding table
    #[error("token id {id} is outside the vocabulary [0, {vocab_size})")]
    TokenOutOfRange { id: i64, vocab_size: usize },
}

impl EncoderError {
    /// Shorthand for building a [`EncoderError::ShapeMismatch`].
    pub fn shape(what: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.into(),
            actual:   actual.to_vec(),
        }
    }
}
