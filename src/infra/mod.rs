// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the output directory of a run:
//
//   checkpoint.rs - best-model weights (CompactRecorder), the
//                   best-model triple and the run's TrainConfig
//
//   metrics.rs    - loss / validation tables as CSV, rewritten
//                   progressively while training runs
//
//   charts.rs     - SVG line charts of the per-epoch means
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Best-model checkpoint saving and loading
pub mod checkpoint;

/// Training tables and end-of-run reporting
pub mod metrics;

/// Per-epoch line charts
pub mod charts;
