// ============================================================
// Layer 5: Evaluator
// ============================================================
use anyhow::{bail, Result};
use burn::prelude::*;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::LeNet;

/// Fraction of misclassified images over the whole partition,
/// including a trailing partial batch.
pub fn partition_error<B: Backend>(
    model:      &LeNet<B>,
    dataset:    &ImageDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<f64> {
    if dataset.image_count() == 0 {
        bail!("cannot evaluate an empty partition");
    }
    if batch_size == 0 {
        bail!("evaluation batch size must be at least 1");
    }

    let batcher = ImageBatcher::<B>::new(device.clone());
    let mut wrong = 0usize;
    let mut index = 0usize;
    while let Some(batch) = batcher.batch_at(dataset, index, batch_size) {
        wrong += model.count_errors(batch.images, batch.targets);
        index += 1;
    }

    Ok(wrong as f64 / dataset.image_count() as f64)
}

/// The best saved model, rebuilt from its checkpoint for scoring.
pub struct Evaluator<B: Backend> {
    model:      LeNet<B>,
    batch_size: usize,
    device:     B::Device,
}

impl<B: Backend> Evaluator<B> {
    /// `cfg` must be the config the checkpoint was trained with.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, cfg: &TrainConfig, device: B::Device) -> Result<Self> {
        let model: LeNet<B> = cfg.model_config().init(&device)?;
        let model = ckpt_manager.load_best_model(model, &device)?;
        tracing::info!("Best model loaded from '{}'", ckpt_manager.dir().display());

        Ok(Self { model, batch_size: cfg.batch_size, device })
    }

    pub fn error_on(&self, dataset: &ImageDataset) -> Result<f64> {
        partition_error(&self.model, dataset, self.batch_size, &self.device)
    }
}
