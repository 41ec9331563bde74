use std::path::PathBuf;

use thiserror::Error;

/// Failures that end a training or evaluation run.
///
/// Everything here is fatal: the run is deterministic, so nothing is retried.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("dataset batch '{}' is missing", .path.display())]
    MissingBatch { path: PathBuf },

    #[error("dataset batch '{}' is malformed: {reason}", .path.display())]
    MalformedBatch { path: PathBuf, reason: String },

    #[error("shape mismatch at {layer}: expected {expected}, found {found}")]
    ShapeMismatch {
        layer:    String,
        expected: String,
        found:    String,
    },

    #[error("training diverged: loss {loss} at iteration {iteration} is not finite")]
    Diverged { iteration: usize, loss: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
