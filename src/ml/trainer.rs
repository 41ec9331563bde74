// ============================================================
// Layer 5: Training Loop
// ============================================================
// Epoch / mini-batch loop with periodic validation and
// patience-based early stopping. The loop only sees the
// Learner trait; run_training wires in the Burn learner.
//
// Per mini-batch, in this order:
//   1. optimizer step, append the loss record
//   2. every `validation_frequency` iterations: validate; on a
//      strict improvement score the test set (and only then)
//      and checkpoint the model
//   3. stop if patience ≤ iteration, even mid-epoch
// After each epoch: stop if the epoch limit is reached.

use anyhow::Result;
use burn::{optim::SgdConfig, tensor::backend::AutodiffBackend};

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::Partitions;
use crate::domain::error::TrainError;
use crate::domain::traits::{Learner, TrainingObserver};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    early_stopping::{iteration_index, validation_frequency, Phase, TrainingState},
    learner::CnnLearner,
    model::LeNet,
    schedule::LearningRateSchedule,
};

/// Log a progress line every this many iterations.
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub epoch_limit:      usize,
    pub initial_patience: usize,
}

pub fn run_early_stopping<L, O>(
    learner:  &mut L,
    observer: &mut O,
    schedule: &LearningRateSchedule,
    settings: LoopSettings,
) -> Result<TrainingState>
where
    L: Learner + ?Sized,
    O: TrainingObserver + ?Sized,
{
    let batches = learner.batches_per_epoch();
    let frequency = validation_frequency(batches, settings.initial_patience);
    tracing::info!(
        "Training {} mini-batches per epoch, validating every {} iterations",
        batches,
        frequency
    );

    let mut state = TrainingState::new(settings.initial_patience, schedule)
        .finish_epoch(settings.epoch_limit);

    while state.is_running() {
        state = state.begin_epoch(schedule);
        observer.epoch_started(state.epoch, &state.record)?;
        tracing::debug!("Epoch {} learning rate {}", state.epoch, state.learning_rate);

        for batch_index in 0..batches {
            let iteration = iteration_index(state.epoch, batches, batch_index);
            if iteration % PROGRESS_EVERY == 0 {
                tracing::info!("training @ iter = {}", iteration);
            }

            let cost = learner.train_batch(batch_index, state.learning_rate)?;
            if !cost.is_finite() {
                return Err(TrainError::Diverged { iteration, loss: cost }.into());
            }
            state = state.record_loss(iteration, cost);

            if (iteration + 1) % frequency == 0 {
                let error = learner.validation_error()?;
                tracing::info!(
                    "epoch {}, minibatch {}/{}, validation error {:.6} %",
                    state.epoch,
                    batch_index + 1,
                    batches,
                    error * 100.0
                );

                let (next, outcome) = state.record_validation(iteration, error);
                state = next;

                if outcome.is_improved() {
                    let score = learner.test_error()?;
                    state = state.record_test_score(score);
                    learner.save_best(&state.best)?;
                    tracing::info!(
                        "     epoch {}, minibatch {}/{}, test error of best model {:.6} %",
                        state.epoch,
                        batch_index + 1,
                        batches,
                        score * 100.0
                    );
                }
            }

            state = state.check_patience(iteration);
            if !state.is_running() {
                break;
            }
        }

        state = state.finish_epoch(settings.epoch_limit);
    }

    match state.phase {
        Phase::StoppedByPatience => tracing::info!("Stopped: patience exhausted at epoch {}", state.epoch),
        _ => tracing::info!("Stopped: epoch limit {} reached", settings.epoch_limit),
    }
    Ok(state)
}

/// Build the LeNet and SGD optimizer for `cfg` and train on `partitions`.
pub fn run_training<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    partitions: Partitions,
    checkpoint: Option<CheckpointManager>,
    observer:   &mut dyn TrainingObserver,
    device:     B::Device,
) -> Result<TrainingState> {
    let model: LeNet<B> = cfg.model_config().init(&device)?;
    tracing::info!("Model ready: kernels {:?}", cfg.kernel_counts);

    // No momentum, no weight decay: the L2 term lives in the loss.
    let optim = SgdConfig::new().init::<B, LeNet<B>>();

    let mut learner = CnnLearner::new(model, optim, partitions, cfg.batch_size, device, checkpoint)?;
    let schedule = LearningRateSchedule::new(cfg.learning_rate);
    let settings = LoopSettings {
        epoch_limit:      cfg.epoch_limit,
        initial_patience: cfg.initial_patience,
    };

    run_early_stopping(&mut learner, observer, &schedule, settings)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ImageDataset;
    use crate::domain::image::{LabeledImage, IMAGE_PIXELS};
    use crate::domain::records::{BestModel, TrainingRecord};
    use std::cell::Cell;
    use burn::backend::{Autodiff, NdArray};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Scripted learner: validation errors cycle through a fixed list.
    struct Scripted {
        batches:    usize,
        val_errors: Vec<f64>,
        loss:       f64,
        trained:    Vec<(usize, f64)>,
        saves:      usize,
        val:        Cell<usize>,
        test:       Cell<usize>,
    }

    impl Scripted {
        fn new(batches: usize, val_errors: Vec<f64>) -> Self {
            Self {
                batches,
                val_errors,
                loss:    1.0,
                trained: Vec::new(),
                saves:   0,
                val:     Cell::new(0),
                test:    Cell::new(0),
            }
        }
    }

    impl Learner for Scripted {
        fn batches_per_epoch(&self) -> usize {
            self.batches
        }

        fn train_batch(&mut self, batch_index: usize, learning_rate: f64) -> Result<f64> {
            self.trained.push((batch_index, learning_rate));
            Ok(self.loss)
        }

        fn validation_error(&self) -> Result<f64> {
            let n = self.val.get();
            self.val.set(n + 1);
            Ok(self.val_errors[n % self.val_errors.len()])
        }

        fn test_error(&self) -> Result<f64> {
            self.test.set(self.test.get() + 1);
            Ok(0.25)
        }

        fn save_best(&mut self, _best: &BestModel) -> Result<()> {
            self.saves += 1;
            Ok(())
        }
    }

    fn settings(epoch_limit: usize, initial_patience: usize) -> LoopSettings {
        LoopSettings { epoch_limit, initial_patience }
    }

    #[test]
    fn test_epoch_limit_stops_with_every_batch_trained() {
        let mut learner = Scripted::new(5, vec![0.5]);
        let schedule = LearningRateSchedule::new(0.15);

        let state = run_early_stopping(&mut learner, &mut (), &schedule, settings(3, 10_000)).unwrap();

        assert_eq!(state.phase, Phase::StoppedByEpochLimit);
        assert_eq!(state.epoch, 3);
        assert_eq!(state.record.losses().len(), 15);
        // validation once per epoch (frequency = 5)
        assert_eq!(learner.val.get(), 3);
    }

    #[test]
    fn test_iterations_strictly_increase_and_follow_formula() {
        let mut learner = Scripted::new(4, vec![0.5]);
        let schedule = LearningRateSchedule::new(0.15);
        let state = run_early_stopping(&mut learner, &mut (), &schedule, settings(3, 10_000)).unwrap();

        for (i, rec) in state.record.losses().iter().enumerate() {
            assert_eq!(rec.iteration, i);
            assert_eq!(rec.iteration, iteration_index(rec.epoch, 4, i % 4));
        }
        let batch_order: Vec<usize> = learner.trained.iter().map(|t| t.0).collect();
        assert_eq!(batch_order, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_learning_rate_follows_schedule_per_epoch() {
        let mut learner = Scripted::new(2, vec![0.5]);
        let schedule = LearningRateSchedule::new(0.15);
        run_early_stopping(&mut learner, &mut (), &schedule, settings(20, 10_000)).unwrap();

        for (i, &(_, lr)) in learner.trained.iter().enumerate() {
            let epoch = i / 2 + 1;
            assert_eq!(lr, schedule.rate_at(epoch));
        }
    }

    #[test]
    fn test_test_set_scored_once_per_improvement() {
        // improvements at checks 1, 2 and 4; check 3 and 5 are worse or equal
        let errors = vec![0.9, 0.8, 0.85, 0.7, 0.7];
        let mut learner = Scripted::new(1, errors);
        let schedule = LearningRateSchedule::new(0.15);

        let state = run_early_stopping(&mut learner, &mut (), &schedule, settings(5, 10_000)).unwrap();

        assert_eq!(learner.val.get(), 5);
        assert_eq!(learner.test.get(), 3);
        assert_eq!(state.test_evaluations, 3);
        assert_eq!(learner.saves, 3);
        assert_eq!(state.best.validation_loss, 0.7);
        assert_eq!(state.best.iteration, 3);
        assert_eq!(state.best.test_score, 0.25);
    }

    #[test]
    fn test_best_is_running_minimum() {
        let errors = vec![0.6, 0.9, 0.4, 0.5, 0.45, 0.3, 0.8];
        let mut learner = Scripted::new(1, errors);
        let schedule = LearningRateSchedule::new(0.15);

        let state = run_early_stopping(&mut learner, &mut (), &schedule, settings(7, 10_000)).unwrap();

        assert_eq!(Some(state.best.validation_loss), state.record.min_validation_error());
        assert_eq!(state.best.validation_loss, 0.3);
    }

    #[test]
    fn test_patience_stops_mid_epoch() {
        // 4 batches per epoch, patience 10 → validate every 4 iterations.
        // The first check (iteration 3) extends patience to max(10, 6) = 10.
        let mut learner = Scripted::new(4, vec![0.5]);
        let schedule = LearningRateSchedule::new(0.15);

        let state = run_early_stopping(&mut learner, &mut (), &schedule, settings(100, 10)).unwrap();

        assert_eq!(state.phase, Phase::StoppedByPatience);
        assert_eq!(state.epoch, 3);
        // iterations 0..=10: stopped right after iteration 10, batch 2 of epoch 3
        assert_eq!(state.record.losses().len(), 11);
        assert_eq!(state.record.losses().last().unwrap().iteration, 10);
        assert_eq!(learner.test.get(), 1);
    }

    #[test]
    fn test_divergence_is_reported() {
        let mut learner = Scripted::new(2, vec![0.5]);
        learner.loss = f64::NAN;
        let schedule = LearningRateSchedule::new(0.15);

        let err = run_early_stopping(&mut learner, &mut (), &schedule, settings(3, 10_000)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::Diverged { iteration: 0, .. })
        ));
    }

    #[test]
    fn test_observer_sees_every_epoch_start() {
        struct Epochs(Vec<(usize, usize)>);
        impl TrainingObserver for Epochs {
            fn epoch_started(&mut self, epoch: usize, record: &TrainingRecord) -> Result<()> {
                self.0.push((epoch, record.losses().len()));
                Ok(())
            }
        }

        let mut learner = Scripted::new(2, vec![0.5]);
        let mut observer = Epochs(Vec::new());
        let schedule = LearningRateSchedule::new(0.15);
        run_early_stopping(&mut learner, &mut observer, &schedule, settings(3, 10_000)).unwrap();

        assert_eq!(observer.0, vec![(1, 0), (2, 2), (3, 4)]);
    }

    // ── End-to-end on a real network ─────────────────────────────────────────

    fn synthetic_image(rng: &mut StdRng, label: usize) -> LabeledImage {
        let pixels = (0..IMAGE_PIXELS).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
        LabeledImage::new(pixels, label)
    }

    #[test]
    fn test_end_to_end_synthetic_dataset() {
        type TestBackend = Autodiff<NdArray>;

        let mut rng = StdRng::seed_from_u64(11);
        let partitions = Partitions {
            train: ImageDataset::new(vec![synthetic_image(&mut rng, 1), synthetic_image(&mut rng, 2)]),
            valid: ImageDataset::new(vec![synthetic_image(&mut rng, 3)]),
            test:  ImageDataset::new(vec![synthetic_image(&mut rng, 4)]),
        };

        let cfg = TrainConfig {
            batch_size:    1,
            kernel_counts: vec![1, 1, 1],
            epoch_limit:   2,
            seed:          1234,
            ..TrainConfig::default()
        };

        let state = run_training::<TestBackend>(&cfg, partitions, None, &mut (), Default::default()).unwrap();

        let n_train_batches = 2;
        assert_eq!(state.phase, Phase::StoppedByEpochLimit);
        assert_eq!(state.record.losses().len(), cfg.epoch_limit * n_train_batches);
        assert!(state.record.losses().iter().all(|r| r.cost.is_finite()));
        assert_eq!(state.record.validations().len(), 2);
        assert_eq!(Some(state.best.validation_loss), state.record.min_validation_error());
    }

    #[test]
    fn test_partial_training_batch_rejected() {
        type TestBackend = Autodiff<NdArray>;

        let mut rng = StdRng::seed_from_u64(3);
        let partitions = Partitions {
            train: ImageDataset::new(vec![synthetic_image(&mut rng, 0)]),
            valid: ImageDataset::new(vec![synthetic_image(&mut rng, 0)]),
            test:  ImageDataset::new(vec![synthetic_image(&mut rng, 0)]),
        };
        let cfg = TrainConfig {
            batch_size:    2,
            kernel_counts: vec![1, 1, 1],
            ..TrainConfig::default()
        };

        let result = run_training::<TestBackend>(&cfg, partitions, None, &mut (), Default::default());
        assert!(result.is_err());
    }
}
