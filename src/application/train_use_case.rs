// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate the config
//   Step 2: Load CIFAR-10 batches       (Layer 4 - data)
//   Step 3: Split + standardize         (Layer 4 - data)
//   Step 4: Save config for evaluation  (Layer 6 - infra)
//   Step 5: Run the training loop       (Layer 5 - ml)
//   Step 6: Write tables and charts     (Layer 6 - infra)
//   Step 7: Summarize the run
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Instant};

use crate::data::{dataset::Partitions, loader::CifarLoader};
use crate::domain::error::TrainError;
use crate::domain::records::BestModel;
use crate::domain::traits::ImageSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsWriter};
use crate::ml::{
    default_device,
    early_stopping::{Phase, INITIAL_PATIENCE},
    model::LeNetConfig,
    trainer::run_training,
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every option of a run. Serialisable so evaluation can rebuild
// the same network from train_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_dir:      PathBuf,
    pub output_dir:       PathBuf,
    pub learning_rate:    f64,
    pub epoch_limit:      usize,
    pub kernel_counts:    Vec<usize>,
    pub batch_size:       usize,
    pub validation_size:  usize,
    pub initial_patience: usize,
    pub seed:             u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_dir:      PathBuf::from("cifar-10-batches-bin"),
            output_dir:       PathBuf::from("runs"),
            learning_rate:    0.15,
            epoch_limit:      200,
            kernel_counts:    vec![32, 32, 64],
            batch_size:       500,
            validation_size:  7500,
            initial_patience: INITIAL_PATIENCE,
            seed:             23455,
        }
    }
}

impl TrainConfig {
    /// Checks that do not need the data. The validation size is
    /// checked against the pool once it has been loaded.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch size must be at least 1".into()));
        }
        if self.kernel_counts.len() != 3 || self.kernel_counts.contains(&0) {
            return Err(TrainError::InvalidConfig(format!(
                "expected three positive kernel counts, got {:?}",
                self.kernel_counts
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.validation_size == 0 {
            return Err(TrainError::InvalidConfig("validation size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn model_config(&self) -> LeNetConfig {
        LeNetConfig::new(self.kernel_counts.clone()).with_seed(self.seed)
    }
}

// ─── Run Summary ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub best:         BestModel,
    pub phase:        Phase,
    pub epochs:       usize,
    pub iterations:   usize,
    pub elapsed_secs: f64,
}

impl fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.best.is_set() {
            writeln!(
                f,
                "Optimization complete. Best validation score of {:.6} % obtained at iteration {}, \
                 with test performance {:.6} %",
                self.best.validation_loss * 100.0,
                self.best.iteration + 1,
                self.best.test_score * 100.0
            )?;
        } else {
            writeln!(f, "Optimization complete. No validation check was run.")?;
        }
        let reason = match self.phase {
            Phase::StoppedByPatience => "patience exhausted",
            _ => "epoch limit reached",
        };
        write!(
            f,
            "Ran {} epochs ({} iterations, {}) in {:.2} minutes",
            self.epochs,
            self.iterations,
            reason,
            self.elapsed_secs / 60.0
        )
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Load the CIFAR-10 batches from the configured directory and train.
    pub fn execute(&self) -> Result<TrainingSummary> {
        let loader = CifarLoader::new(&self.config.dataset_dir);
        tracing::info!("Loading CIFAR-10 from: {}", loader.dir().display());
        self.execute_with(&loader)
    }

    /// Train on images from any source.
    pub fn execute_with(&self, source: &dyn ImageSource) -> Result<TrainingSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 2–3: Load, split, standardize ───────────────────────────────
        let partitions = Partitions::prepare(source, cfg.validation_size)?;

        // ── Step 4: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 5: Training loop (Layer 5) ───────────────────────────────────
        let mut metrics = MetricsWriter::new(&cfg.output_dir)?;
        tracing::info!("... training");
        let started = Instant::now();
        let state = run_training::<TrainBackend>(
            cfg,
            partitions,
            Some(ckpt_manager),
            &mut metrics,
            default_device(),
        )?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        // ── Step 6: Final tables and charts ───────────────────────────────────
        metrics.finish(&state.record)?;

        // ── Step 7: Summary ───────────────────────────────────────────────────
        let summary = TrainingSummary {
            best:         state.best,
            phase:        state.phase,
            epochs:       state.epoch,
            iterations:   state.record.losses().len(),
            elapsed_secs,
        };
        tracing::info!("{}", summary);
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{RawImage, IMAGE_PIXELS};
    use crate::infra::metrics::{COST_CHART, COST_TABLE, VAL_ERROR_TABLE};

    #[test]
    fn test_default_config_is_valid() {
        let cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model_config().kernel_counts, vec![32, 32, 64]);
        assert_eq!(cfg.model_config().seed, 23455);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { kernel_counts: vec![32, 64], ..TrainConfig::default() },
            TrainConfig { kernel_counts: vec![32, 0, 64], ..TrainConfig::default() },
            TrainConfig { learning_rate: 0.0, ..TrainConfig::default() },
            TrainConfig { validation_size: 0, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn test_summary_reports_one_based_iteration() {
        let summary = TrainingSummary {
            best:         BestModel { validation_loss: 0.25, iteration: 84, test_score: 0.3 },
            phase:        Phase::StoppedByPatience,
            epochs:       3,
            iterations:   200,
            elapsed_secs: 90.0,
        };
        let text = summary.to_string();
        assert!(text.contains("25.000000 %"));
        assert!(text.contains("iteration 85"));
        assert!(text.contains("30.000000 %"));
        assert!(text.contains("1.50 minutes"));
    }

    struct Synthetic;

    impl Synthetic {
        fn images(n: usize, offset: u8) -> Vec<RawImage> {
            (0..n)
                .map(|i| {
                    let label = (i % 10) as u8;
                    let pixels = (0..IMAGE_PIXELS)
                        .map(|p| ((p * 7 + i * 31) as u8).wrapping_add(offset))
                        .collect();
                    RawImage::new(label, pixels)
                })
                .collect()
        }
    }

    impl ImageSource for Synthetic {
        fn load_training_pool(&self) -> Result<Vec<RawImage>> {
            Ok(Self::images(6, 0))
        }

        fn load_test_set(&self) -> Result<Vec<RawImage>> {
            Ok(Self::images(2, 13))
        }
    }

    #[test]
    fn test_execute_writes_run_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            output_dir:      dir.path().to_path_buf(),
            epoch_limit:     2,
            kernel_counts:   vec![1, 1, 1],
            batch_size:      2,
            validation_size: 2,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg).execute_with(&Synthetic).unwrap();

        assert_eq!(summary.phase, Phase::StoppedByEpochLimit);
        assert_eq!(summary.epochs, 2);
        assert_eq!(summary.iterations, 4);
        assert!(summary.best.is_set());

        for file in [COST_TABLE, VAL_ERROR_TABLE, COST_CHART, "train_config.json", "best.json"] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
    }

    #[test]
    fn test_validation_larger_than_pool_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            output_dir:      dir.path().to_path_buf(),
            kernel_counts:   vec![1, 1, 1],
            batch_size:      1,
            validation_size: 5,
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute_with(&Synthetic).is_err());
    }
}
