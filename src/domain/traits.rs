// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Every stage of the encoder pipeline is a Layer: something
// with a fixed `forward(input) -> output` contract.
//
//   PositionalEncoding   : hidden            → hidden
//   DotProductAttention  : (Q, K, V, lens)   → (context, weights)
//   MultiHeadAttention   : (Q, K, V, lens)   → (context, weights)
//   FeedForward          : hidden            → hidden
//   EncoderBlock         : (Q, K, V, lens)   → (hidden, weights)
//   TransformerEncoder   : (token ids, lens) → (hidden, [weights])
//
// Composition happens through ownership: the encoder owns its
// blocks, each block owns its attention, feed-forward and
// normalisation sub-layers. Nothing is looked up by name.
//
// The trait itself carries no framework types, so this layer
// stays free of Burn imports.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §19 (Associated Types)

use crate::domain::error::EncoderError;

// ─── Layer ────────────────────────────────────────────────────────────────────
/// A forward-only computation stage consuming `Input`.
///
/// The input is a trait parameter rather than an associated type so a
/// backend-agnostic stage (one with no tensors of its own) can serve
/// every backend's tensors.
///
/// Implementations must validate their input shapes up front and
/// report problems as [`EncoderError`] instead of panicking.
pub trait Layer<Input> {
    /// What the layer produces
    type Output;

    /// Run the layer on one input.
    fn forward(&self, input: Input) -> Result<Self::Output, EncoderError>;
}

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled token sequences.
///
/// Implementations:
///   - ToyDataset → uniformly random tokens and labels
pub trait SampleSource {
    /// Produce every available sample.
    fn samples(&self) -> Vec<crate::domain::sequence::LabeledSequence>;
}
