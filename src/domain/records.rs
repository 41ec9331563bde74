// ============================================================
// Layer 3: Training Records
// ============================================================
// The append-only log written by the training loop and read by
// reporting once training has finished:
//
//   LossRecord        one row per mini-batch   (iteration, epoch, cost)
//   ValidationRecord  one row per validation   (iteration, epoch, val_error)
//   BestModel         best validation loss, where it happened, and
//                     the test error measured at that point
//
// Rows derive Serialize so the CSV writer can emit them directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Training loss observed on one mini-batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub iteration: usize,
    pub epoch:     usize,
    pub cost:      f64,
}

/// Mean zero-one error over the validation partition at one check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub iteration: usize,
    pub epoch:     usize,
    pub val_error: f64,
}

/// Mean of one quantity over all rows sharing an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMean {
    pub epoch: usize,
    pub value: f64,
}

/// Best-so-far tracker. Starts at +inf and only moves on a strict improvement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestModel {
    pub validation_loss: f64,
    pub iteration:       usize,
    pub test_score:      f64,
}

impl BestModel {
    pub fn is_set(&self) -> bool {
        self.validation_loss.is_finite()
    }
}

impl Default for BestModel {
    fn default() -> Self {
        Self {
            validation_loss: f64::INFINITY,
            iteration:       0,
            test_score:      0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingRecord {
    losses:      Vec<LossRecord>,
    validations: Vec<ValidationRecord>,
}

impl TrainingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_loss(&mut self, iteration: usize, epoch: usize, cost: f64) {
        self.losses.push(LossRecord { iteration, epoch, cost });
    }

    pub fn push_validation(&mut self, iteration: usize, epoch: usize, val_error: f64) {
        self.validations.push(ValidationRecord { iteration, epoch, val_error });
    }

    pub fn losses(&self) -> &[LossRecord] {
        &self.losses
    }

    pub fn validations(&self) -> &[ValidationRecord] {
        &self.validations
    }

    /// Smallest validation error recorded so far, if any check has run.
    pub fn min_validation_error(&self) -> Option<f64> {
        self.validations
            .iter()
            .map(|v| v.val_error)
            .reduce(f64::min)
    }

    /// Per-epoch mean training loss, ordered by epoch.
    pub fn epoch_mean_costs(&self) -> Vec<EpochMean> {
        epoch_means(self.losses.iter().map(|r| (r.epoch, r.cost)))
    }

    /// Per-epoch mean validation error, ordered by epoch.
    /// Epochs without a validation check are absent.
    pub fn epoch_mean_val_errors(&self) -> Vec<EpochMean> {
        epoch_means(self.validations.iter().map(|r| (r.epoch, r.val_error)))
    }
}

fn epoch_means(rows: impl Iterator<Item = (usize, f64)>) -> Vec<EpochMean> {
    let mut groups: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for (epoch, value) in rows {
        let entry = groups.entry(epoch).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(epoch, (sum, count))| EpochMean { epoch, value: sum / count as f64 })
        .collect()
}
