// ============================================================
// Layer 5: Early-Stopping State
// ============================================================
// All mutable state of a training run lives in one value,
// TrainingState, which each step function consumes and returns:
//
//   begin_epoch        epoch += 1, look up the scheduled rate
//   record_loss        append (iteration, epoch, cost)
//   record_validation  append (iteration, epoch, error); on a
//                      strict improvement move the best-so-far
//                      marker and maybe extend patience
//   record_test_score  attach the test error to the new best
//   check_patience     stop once patience ≤ iteration
//   finish_epoch       stop once the epoch limit is reached
//
//   Running ──patience ≤ iteration──▶ StoppedByPatience
//      │
//      └──────epoch == limit────────▶ StoppedByEpochLimit

use serde::{Deserialize, Serialize};

use crate::domain::records::{BestModel, TrainingRecord};
use crate::ml::schedule::LearningRateSchedule;

/// Iterations trained before patience can run out.
pub const INITIAL_PATIENCE: usize = 10_000;
/// On a significant improvement patience grows to iteration × this.
pub const PATIENCE_INCREASE: usize = 2;
/// An error below best × this counts as a significant improvement.
pub const IMPROVEMENT_THRESHOLD: f64 = 0.995;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Running,
    StoppedByPatience,
    StoppedByEpochLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    NotImproved,
    Improved { significant: bool },
}

impl ValidationOutcome {
    pub fn is_improved(&self) -> bool {
        matches!(self, Self::Improved { .. })
    }
}

/// Global iteration index of `batch_index` within 1-based `epoch`.
pub fn iteration_index(epoch: usize, batches_per_epoch: usize, batch_index: usize) -> usize {
    (epoch - 1) * batches_per_epoch + batch_index
}

/// Validate every `min(batches_per_epoch, patience / 2)` iterations, at least every one.
pub fn validation_frequency(batches_per_epoch: usize, initial_patience: usize) -> usize {
    batches_per_epoch.min(initial_patience / 2).max(1)
}

#[derive(Debug, Clone)]
pub struct TrainingState {
    pub phase:            Phase,
    pub epoch:            usize,
    pub patience:         usize,
    pub learning_rate:    f64,
    pub best:             BestModel,
    pub record:           TrainingRecord,
    pub test_evaluations: usize,
}

impl TrainingState {
    pub fn new(initial_patience: usize, schedule: &LearningRateSchedule) -> Self {
        Self {
            phase:            Phase::Running,
            epoch:            0,
            patience:         initial_patience,
            learning_rate:    schedule.rate_at(0),
            best:             BestModel::default(),
            record:           TrainingRecord::new(),
            test_evaluations: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn begin_epoch(mut self, schedule: &LearningRateSchedule) -> Self {
        self.epoch += 1;
        self.learning_rate = schedule.rate_at(self.epoch);
        self
    }

    pub fn record_loss(mut self, iteration: usize, cost: f64) -> Self {
        self.record.push_loss(iteration, self.epoch, cost);
        self
    }

    pub fn record_validation(mut self, iteration: usize, error: f64) -> (Self, ValidationOutcome) {
        self.record.push_validation(iteration, self.epoch, error);

        if !(error < self.best.validation_loss) {
            return (self, ValidationOutcome::NotImproved);
        }

        let significant = error < self.best.validation_loss * IMPROVEMENT_THRESHOLD;
        if significant {
            self.patience = self.patience.max(iteration * PATIENCE_INCREASE);
        }

        self.best.validation_loss = error;
        self.best.iteration = iteration;
        (self, ValidationOutcome::Improved { significant })
    }

    pub fn record_test_score(mut self, score: f64) -> Self {
        self.best.test_score = score;
        self.test_evaluations += 1;
        self
    }

    pub fn check_patience(mut self, iteration: usize) -> Self {
        if self.is_running() && self.patience <= iteration {
            self.phase = Phase::StoppedByPatience;
        }
        self
    }

    pub fn finish_epoch(mut self, epoch_limit: usize) -> Self {
        if self.is_running() && self.epoch >= epoch_limit {
            self.phase = Phase::StoppedByEpochLimit;
        }
        self
    }
}
