// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application and the training loop program against these
// traits rather than concrete types:
//   - CifarLoader implements ImageSource
//   - CnnLearner (Burn model + SGD) implements Learner
//   - MetricsWriter implements TrainingObserver
//
// Tests substitute in-memory sources and scripted learners.

use anyhow::Result;

use crate::domain::image::RawImage;
use crate::domain::records::{BestModel, TrainingRecord};

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the raw labelled images of a dataset.
pub trait ImageSource {
    /// All training batches concatenated in file order.
    /// Validation rows are carved out of this pool by the caller.
    fn load_training_pool(&self) -> Result<Vec<RawImage>>;

    /// The held-out test batch.
    fn load_test_set(&self) -> Result<Vec<RawImage>>;
}

// ─── Learner ──────────────────────────────────────────────────────────────────
/// A model together with its data and update rule, seen from the
/// training loop.
pub trait Learner {
    /// Number of full mini-batches in the training partition.
    fn batches_per_epoch(&self) -> usize;

    /// Run one optimizer step on training mini-batch `batch_index`
    /// with the given learning rate and return that batch's loss.
    fn train_batch(&mut self, batch_index: usize, learning_rate: f64) -> Result<f64>;

    /// Mean zero-one error over the whole validation partition.
    fn validation_error(&self) -> Result<f64>;

    /// Mean zero-one error over the whole test partition.
    fn test_error(&self) -> Result<f64>;

    /// Called once per new best validation score, after its test score is known.
    fn save_best(&mut self, _best: &BestModel) -> Result<()> {
        Ok(())
    }
}

// ─── TrainingObserver ─────────────────────────────────────────────────────────
/// Hook invoked by the training loop at epoch boundaries.
pub trait TrainingObserver {
    /// `epoch` has just started; `record` holds every row logged so far.
    fn epoch_started(&mut self, epoch: usize, record: &TrainingRecord) -> Result<()>;
}

/// No-op observer.
impl TrainingObserver for () {
    fn epoch_started(&mut self, _epoch: usize, _record: &TrainingRecord) -> Result<()> {
        Ok(())
    }
}
