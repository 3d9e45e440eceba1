// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "I need some token sequences" and
// "here is a tensor batch":
//
//   ToyDataset / TokenBatch   → plain-Rust token rows
//       │
//       ▼
//   split_train_val           → seeded shuffle + split
//       │
//       ▼
//   SequenceBatcher           → Int token tensors + label tensors
//
// Reference: Burn Book §4 (Datasets and Batchers)
//            Rust Book §13 (Iterators and Closures)

/// Random labelled sequences for the classification run
pub mod toy;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Stacks token rows into tensor batches
pub mod batcher;
