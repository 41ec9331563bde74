// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Persists the best model of a run with a full-precision
// MessagePack + gzip recorder, so reloaded weights are bit-identical
// to the ones that were scored during training.
//
// What gets saved:
//   1. best_model.mpk.gz  - weights of the best-validation model,
//                           overwritten on every new best
//   2. best.json          - the matching BestModel triple
//   3. train_config.json  - the TrainConfig of the run, needed to
//                           rebuild the architecture before loading
//
// Layout:
//   runs/
//     best_model.mpk.gz
//     best.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::records::BestModel;
use crate::ml::model::LeNet;

const BEST_MODEL_FILE: &str = "best_model";
const BEST_SUMMARY_FILE: &str = "best.json";
const CONFIG_FILE: &str = "train_config.json";

/// Reloaded weights must equal the saved ones exactly, so no half precision.
type BestModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates `dir` (and its parents) if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Opens the output directory of an existing run without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("Run directory '{}' does not exist. Have you run 'train'?", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best-model weights and summary.
    pub fn save_best_model<B: Backend>(&self, model: &LeNet<B>, best: &BestModel) -> Result<()> {
        // the recorder appends its own extension
        let path = self.dir.join(BEST_MODEL_FILE);
        BestModelRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let summary_path = self.dir.join(BEST_SUMMARY_FILE);
        fs::write(&summary_path, serde_json::to_string_pretty(best)?)
            .with_context(|| format!("Failed to write '{}'", summary_path.display()))?;

        tracing::debug!(
            "Saved best model (iteration {}, validation error {:.4})",
            best.iteration,
            best.validation_loss
        );
        Ok(())
    }

    /// Load the best weights into `model`, which must have the saved architecture.
    pub fn load_best_model<B: Backend>(&self, model: LeNet<B>, device: &B::Device) -> Result<LeNet<B>> {
        let path = self.dir.join(BEST_MODEL_FILE);
        let record = BestModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has a run completed a validation check?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn load_best_summary(&self) -> Result<BestModel> {
        let path = self.dir.join(BEST_SUMMARY_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
