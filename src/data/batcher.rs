// ============================================================
// Layer 4: Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a slice of
// LabeledImages into tensors on the target device.
//
//   Input:  N LabeledImages, each IMAGE_PIXELS floats
//   Output: images  [N, 3, 32, 32]
//           targets [N]
//
// Pixels are already channel-major, so flattening all images
// into one Vec and reshaping gives NCHW directly.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageDataset;
use crate::domain::image::{LabeledImage, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH};

/// A mini-batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn size(&self) -> usize {
        self.targets.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Mini-batch `index` of `dataset`: rows `[index * size, (index + 1) * size)`.
    /// Returns None once the index runs past the end.
    pub fn batch_at(&self, dataset: &ImageDataset, index: usize, size: usize) -> Option<ImageBatch<B>> {
        let items = dataset.slice(index.checked_mul(size)?, size);
        if items.is_empty() {
            return None;
        }
        Some(self.batch(items.to_vec(), &self.device))
    }
}

impl<B: Backend> Batcher<B, LabeledImage, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<LabeledImage>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|item| item.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), device)
            .reshape([batch_size, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        ImageBatch { images, targets }
    }
}
