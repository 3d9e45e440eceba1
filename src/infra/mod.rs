// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file output used by the application layer:
//
//   metrics.rs    — per-epoch loss/accuracy appended to a CSV
//
//   run_store.rs  — JSON copies of the run configuration and
//                   the final evaluation report
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Training metrics CSV logger
pub mod metrics;

/// Run configuration / report persistence
pub mod run_store;
