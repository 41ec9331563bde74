// ============================================================
// Layer 2: Evaluate Use Case
// ============================================================
// Reloads the best model of a finished run and scores it:
//   1. Read train_config.json from the run's output directory
//   2. Rebuild the partitions exactly as training did
//      (same split, same training statistics)
//   3. Load best_model.mpk.gz into a freshly built network
//   4. Report validation and test error

use anyhow::Result;
use std::{fmt, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::{dataset::Partitions, loader::CifarLoader};
use crate::domain::records::BestModel;
use crate::domain::traits::ImageSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{default_device, evaluator::Evaluator, ComputeBackend};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub validation_error: f64,
    pub test_error:       f64,
    /// What the training run recorded for the same weights.
    pub recorded:         BestModel,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation error: {:.6} %", self.validation_error * 100.0)?;
        writeln!(f, "Test error:       {:.6} %", self.test_error * 100.0)?;
        write!(
            f,
            "Recorded at iteration {}: validation {:.6} %, test {:.6} %",
            self.recorded.iteration + 1,
            self.recorded.validation_loss * 100.0,
            self.recorded.test_score * 100.0
        )
    }
}

pub struct EvaluateUseCase {
    output_dir:  PathBuf,
    dataset_dir: Option<PathBuf>,
}

impl EvaluateUseCase {
    /// `dataset_dir` overrides the directory saved in the run's config.
    pub fn new(output_dir: impl Into<PathBuf>, dataset_dir: Option<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), dataset_dir }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let (ckpt, cfg) = self.open_run()?;
        let dataset_dir = self.dataset_dir.clone().unwrap_or_else(|| cfg.dataset_dir.clone());
        self.evaluate(&ckpt, &cfg, &CifarLoader::new(dataset_dir))
    }

    /// Score the run on images from any source.
    pub fn execute_with(&self, source: &dyn ImageSource) -> Result<EvaluationReport> {
        let (ckpt, cfg) = self.open_run()?;
        self.evaluate(&ckpt, &cfg, source)
    }

    fn open_run(&self) -> Result<(CheckpointManager, TrainConfig)> {
        let ckpt = CheckpointManager::open(&self.output_dir)?;
        let cfg = ckpt.load_config()?;
        Ok((ckpt, cfg))
    }

    fn evaluate(
        &self,
        ckpt:   &CheckpointManager,
        cfg:    &TrainConfig,
        source: &dyn ImageSource,
    ) -> Result<EvaluationReport> {
        let partitions = Partitions::prepare(source, cfg.validation_size)?;

        let evaluator = Evaluator::<ComputeBackend>::from_checkpoint(ckpt, cfg, default_device())?;
        let report = EvaluationReport {
            validation_error: evaluator.error_on(&partitions.valid)?,
            test_error:       evaluator.error_on(&partitions.test)?,
            recorded:         ckpt.load_best_summary()?,
        };

        tracing::info!(
            "Best model: validation error {:.6} %, test error {:.6} %",
            report.validation_error * 100.0,
            report.test_error * 100.0
        );
        Ok(report)
    }
}
