// ============================================================
// Layer 5: CNN Learner
// ============================================================
// Binds the Burn model, the SGD optimizer and the three
// partitions behind the Learner trait the training loop drives.
//
// Key Burn details:
//   - Training runs on an AutodiffBackend so loss.backward()
//     produces gradients for every Param
//   - model.valid() returns the same weights on the inner
//     backend, used for validation/test scoring
//   - the optimizer is plain SGD: param ← param − lr × grad

use anyhow::{anyhow, Result};
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::ImageBatcher, dataset::Partitions};
use crate::domain::error::TrainError;
use crate::domain::image::{IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH};
use crate::domain::records::BestModel;
use crate::domain::traits::Learner;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{evaluator::partition_error, model::LeNet};

pub struct CnnLearner<B: AutodiffBackend, O: Optimizer<LeNet<B>, B>> {
    model:      LeNet<B>,
    optim:      O,
    partitions: Partitions,
    batch_size: usize,
    batcher:    ImageBatcher<B>,
    device:     B::Device,
    checkpoint: Option<CheckpointManager>,
}

impl<B: AutodiffBackend, O: Optimizer<LeNet<B>, B>> CnnLearner<B, O> {
    /// Checks the input shape against the network and that at least one
    /// full training mini-batch exists, before anything runs forward.
    pub fn new(
        model:      LeNet<B>,
        optim:      O,
        partitions: Partitions,
        batch_size: usize,
        device:     B::Device,
        checkpoint: Option<CheckpointManager>,
    ) -> Result<Self> {
        model.check_input([batch_size, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH])?;

        if partitions.train.full_batches(batch_size) == 0 {
            return Err(TrainError::InvalidConfig(format!(
                "{} training images do not fill one batch of {}",
                partitions.train.image_count(),
                batch_size
            ))
            .into());
        }

        Ok(Self {
            model,
            optim,
            partitions,
            batch_size,
            batcher: ImageBatcher::new(device.clone()),
            device,
            checkpoint,
        })
    }
}

impl<B: AutodiffBackend, O: Optimizer<LeNet<B>, B>> Learner for CnnLearner<B, O> {
    fn batches_per_epoch(&self) -> usize {
        self.partitions.train.full_batches(self.batch_size)
    }

    fn train_batch(&mut self, batch_index: usize, learning_rate: f64) -> Result<f64> {
        let batch = self
            .batcher
            .batch_at(&self.partitions.train, batch_index, self.batch_size)
            .ok_or_else(|| anyhow!("training mini-batch {batch_index} is out of range"))?;

        let loss = self.model.forward_loss(batch.images, batch.targets);
        let cost: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(learning_rate, self.model.clone(), grads);

        Ok(cost)
    }

    fn validation_error(&self) -> Result<f64> {
        partition_error(&self.model.valid(), &self.partitions.valid, self.batch_size, &self.device)
    }

    fn test_error(&self) -> Result<f64> {
        partition_error(&self.model.valid(), &self.partitions.test, self.batch_size, &self.device)
    }

    fn save_best(&mut self, best: &BestModel) -> Result<()> {
        match &self.checkpoint {
            Some(ckpt) => ckpt.save_best_model(&self.model, best),
            None => Ok(()),
        }
    }
}
