// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, traits and errors that define the core
// concepts of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// The ML layer implements the Layer trait declared here, and
// reports failures with the EncoderError declared here.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every encoder operation
pub mod error;

// Token batches and labelled sequences
pub mod sequence;

// Core abstractions (traits) that other layers implement
pub mod traits;
