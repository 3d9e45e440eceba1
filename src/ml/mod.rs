// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific code.
// Other layers only see tensors at the batcher boundary.
//
// What's in this layer:
//
//   init.rs         — Seeded uniform initialisation for Linear
//                     and Embedding weights
//   positional.rs   — Sinusoidal positional encoding + dropout
//   attention.rs    — Valid-length masking, masked softmax,
//                     scaled dot-product attention
//   multi_head.rs   — Multi-head attention over the above
//   feed_forward.rs — Position-wise two-layer network (ReLU)
//   block.rs        — One encoder block: attention + FFN, each
//                     followed by residual add + layer norm
//   encoder.rs      — Embedding, positional encoding and a
//                     stack of encoder blocks
//   classifier.rs   — Mean-pool + dense + sigmoid head
//   trainer.rs      — Training loop for the toy classifier
//   inspector.rs    — Runs one batch and summarises attention
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod init;
pub mod positional;
pub mod attention;
pub mod multi_head;
pub mod feed_forward;
pub mod block;
pub mod encoder;

/// Binary sequence classifier on top of the encoder
pub mod classifier;

/// Training loop with per-epoch validation
pub mod trainer;

pub mod inspector;
