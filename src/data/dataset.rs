use anyhow::Result;
use burn::data::dataset::Dataset;

use crate::data::{preprocessor::Standardizer, splitter::split_validation};
use crate::domain::image::LabeledImage;
use crate::domain::traits::ImageSource;

/// One immutable, standardized partition.
#[derive(Debug, Clone, Default)]
pub struct ImageDataset {
    images: Vec<LabeledImage>,
}

impl ImageDataset {
    pub fn new(images: Vec<LabeledImage>) -> Self {
        Self { images }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Rows `[start, start + len)`, clipped to the end of the partition.
    pub fn slice(&self, start: usize, len: usize) -> &[LabeledImage] {
        let start = start.min(self.images.len());
        let end = start.saturating_add(len).min(self.images.len());
        &self.images[start..end]
    }

    /// Number of full mini-batches; a trailing partial batch is not trained on.
    pub fn full_batches(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.images.len() / batch_size
        }
    }
}

impl Dataset<LabeledImage> for ImageDataset {
    fn get(&self, index: usize) -> Option<LabeledImage> {
        self.images.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

/// The three disjoint partitions a run trains and evaluates on.
#[derive(Debug, Clone)]
pub struct Partitions {
    pub train: ImageDataset,
    pub valid: ImageDataset,
    pub test:  ImageDataset,
}

impl Partitions {
    /// Load, split and standardize. Statistics come from the
    /// training partition alone and are applied to all three.
    pub fn prepare(source: &dyn ImageSource, validation_size: usize) -> Result<Self> {
        let pool = source.load_training_pool()?;
        let test = source.load_test_set()?;

        let (train, valid) = split_validation(pool, validation_size)?;
        let standardizer = Standardizer::fit(&train)?;

        let partitions = Self {
            train: ImageDataset::new(standardizer.apply(&train)?),
            valid: ImageDataset::new(standardizer.apply(&valid)?),
            test:  ImageDataset::new(standardizer.apply(&test)?),
        };

        tracing::info!(
            "Partitions: {} train, {} validation, {} test",
            partitions.train.len(),
            partitions.valid.len(),
            partitions.test.len()
        );
        Ok(partitions)
    }
}
