// ============================================================
// Layer 4: Feature Standardizer
// ============================================================
// Per-feature standardization of raw pixels:
//
//   x' = (x - mean_train) / std_train
//
// mean and std are computed once, over the TRAINING partition
// only, and the same statistics are applied to train,
// validation and test. Refitting on validation or test data
// would leak held-out information into preprocessing.
//
// std is the population standard deviation. A feature that is
// constant across the training set gets a divisor of 1 so it
// maps to exactly zero instead of NaN.

use crate::domain::error::TrainError;
use crate::domain::image::{LabeledImage, RawImage, IMAGE_PIXELS};

#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Vec<f32>,
    std:  Vec<f32>,
}

impl Standardizer {
    /// Compute per-feature statistics from the training partition.
    pub fn fit(train: &[RawImage]) -> Result<Self, TrainError> {
        if train.is_empty() {
            return Err(TrainError::InvalidConfig(
                "cannot standardize an empty training partition".to_string(),
            ));
        }
        check_width(train)?;

        let n = train.len() as f64;

        // Pass 1: mean. Accumulate in f64 so 40k+ rows don't lose precision.
        let mut sum = vec![0.0f64; IMAGE_PIXELS];
        for image in train {
            for (acc, &p) in sum.iter_mut().zip(&image.pixels) {
                *acc += p as f64;
            }
        }
        let mean: Vec<f64> = sum.into_iter().map(|s| s / n).collect();

        // Pass 2: variance around that mean.
        let mut sq = vec![0.0f64; IMAGE_PIXELS];
        for image in train {
            for ((acc, &p), m) in sq.iter_mut().zip(&image.pixels).zip(&mean) {
                let d = p as f64 - m;
                *acc += d * d;
            }
        }

        let mut constant = 0usize;
        let std: Vec<f32> = sq
            .into_iter()
            .map(|s| {
                let sd = (s / n).sqrt();
                if sd > 0.0 {
                    sd as f32
                } else {
                    constant += 1;
                    1.0
                }
            })
            .collect();

        if constant > 0 {
            tracing::warn!("{} features are constant over the training set", constant);
        }

        Ok(Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            std,
        })
    }

    /// Standardize a partition with the fitted statistics.
    pub fn apply(&self, images: &[RawImage]) -> Result<Vec<LabeledImage>, TrainError> {
        check_width(images)?;

        Ok(images
            .iter()
            .map(|image| {
                let pixels = image
                    .pixels
                    .iter()
                    .zip(self.mean.iter().zip(&self.std))
                    .map(|(&p, (m, s))| (p as f32 - m) / s)
                    .collect();
                LabeledImage::new(pixels, image.label as usize)
            })
            .collect())
    }

    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    pub fn std(&self) -> &[f32] {
        &self.std
    }
}

fn check_width(images: &[RawImage]) -> Result<(), TrainError> {
    match images.iter().find(|i| i.pixels.len() != IMAGE_PIXELS) {
        Some(bad) => Err(TrainError::ShapeMismatch {
            layer:    "input".to_string(),
            expected: format!("{IMAGE_PIXELS} pixels per image"),
            found:    format!("{} pixels", bad.pixels.len()),
        }),
        None => Ok(()),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn image(label: u8, fill: u8) -> RawImage {
        RawImage::new(label, vec![fill; IMAGE_PIXELS])
    }

    #[test]
    fn test_training_partition_is_centred() {
        let train = vec![image(0, 10), image(1, 30)];
        let std = Standardizer::fit(&train).unwrap();

        assert!(std.mean().iter().all(|&m| (m - 20.0).abs() < 1e-6));
        assert!(std.std().iter().all(|&s| (s - 10.0).abs() < 1e-6));

        let out = std.apply(&train).unwrap();
        assert!(out[0].pixels.iter().all(|&p| (p + 1.0).abs() < 1e-6));
        assert!(out[1].pixels.iter().all(|&p| (p - 1.0).abs() < 1e-6));
        assert_eq!(out[1].label, 1);
    }

    #[test]
    fn test_held_out_partitions_reuse_training_statistics() {
        let train = vec![image(0, 10), image(1, 30)];
        let valid = vec![image(2, 50), image(3, 70)];
        let std = Standardizer::fit(&train).unwrap();

        let out = std.apply(&valid).unwrap();
        // (50 - 20) / 10 and (70 - 20) / 10: training stats, not refit on validation.
        assert!(out[0].pixels.iter().all(|&p| (p - 3.0).abs() < 1e-6));
        assert!(out[1].pixels.iter().all(|&p| (p - 5.0).abs() < 1e-6));

        let refit = Standardizer::fit(&valid).unwrap();
        assert_ne!(refit, std);
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let train = vec![image(0, 42), image(1, 42)];
        let std = Standardizer::fit(&train).unwrap();
        let out = std.apply(&train).unwrap();
        assert!(out[0].pixels.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_empty_training_set_rejected() {
        assert!(Standardizer::fit(&[]).is_err());
    }

    #[test]
    fn test_wrong_width_rejected() {
        let bad = vec![RawImage::new(0, vec![0; 12])];
        assert!(matches!(
            Standardizer::fit(&bad),
            Err(TrainError::ShapeMismatch { .. })
        ));
    }
}
