// ============================================================
// Layer 4: CIFAR-10 Batch Loader
// ============================================================
// Reads the binary distribution of CIFAR-10:
//
//   cifar-10-batches-bin/
//     data_batch_1.bin ... data_batch_5.bin   (training pool)
//     test_batch.bin                          (test set)
//
// Each file is a flat sequence of 3073-byte records:
//
//   [label: u8][red: 1024 x u8][green: 1024 x u8][blue: 1024 x u8]
//
// A missing or malformed file aborts the run. There is no
// partial-dataset fallback: training on four of five batches
// would silently change every partition boundary.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::TrainError;
use crate::domain::image::{RawImage, IMAGE_PIXELS, NUM_CLASSES};
use crate::domain::traits::ImageSource;

/// Training batch files, concatenated in this order.
pub const TRAIN_BATCH_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

/// The held-out test batch.
pub const TEST_BATCH_FILE: &str = "test_batch.bin";

/// Bytes per record: one label byte plus the pixels.
pub const RECORD_LEN: usize = 1 + IMAGE_PIXELS;

/// Loads CIFAR-10 binary batches from one directory.
/// Implements the ImageSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct CifarLoader {
    dir: PathBuf,
}

impl CifarLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSource for CifarLoader {
    fn load_training_pool(&self) -> Result<Vec<RawImage>> {
        let mut pool = Vec::new();
        for name in TRAIN_BATCH_FILES {
            let batch = load_batch_file(&self.dir.join(name))?;
            tracing::debug!("Loaded {} ({} images)", name, batch.len());
            pool.extend(batch);
        }

        tracing::info!(
            "Loaded {} training images from '{}'",
            pool.len(),
            self.dir.display()
        );
        Ok(pool)
    }

    fn load_test_set(&self) -> Result<Vec<RawImage>> {
        let test = load_batch_file(&self.dir.join(TEST_BATCH_FILE))?;
        tracing::info!("Loaded {} test images", test.len());
        Ok(test)
    }
}

/// Read and parse one batch file.
fn load_batch_file(path: &Path) -> Result<Vec<RawImage>> {
    if !path.is_file() {
        return Err(TrainError::MissingBatch { path: path.to_path_buf() }.into());
    }

    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    Ok(parse_batch(path, &bytes)?)
}

/// Split raw file bytes into records, validating length and labels.
pub fn parse_batch(path: &Path, bytes: &[u8]) -> Result<Vec<RawImage>, TrainError> {
    let malformed = |reason: String| TrainError::MalformedBatch {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.is_empty() {
        return Err(malformed("file is empty".to_string()));
    }
    if bytes.len() % RECORD_LEN != 0 {
        return Err(malformed(format!(
            "length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_LEN
        )));
    }

    bytes
        .chunks_exact(RECORD_LEN)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0];
            if label as usize >= NUM_CLASSES {
                return Err(malformed(format!("record {i} has label {label}")));
            }
            Ok(RawImage::new(label, record[1..].to_vec()))
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut bytes = vec![label];
        bytes.extend(std::iter::repeat(fill).take(IMAGE_PIXELS));
        bytes
    }

    fn write_batch(dir: &Path, name: &str, records: &[Vec<u8>]) {
        fs::write(dir.join(name), records.concat()).unwrap();
    }

    #[test]
    fn test_parse_two_records() {
        let bytes = [record(3, 10), record(7, 200)].concat();
        let images = parse_batch(Path::new("mem"), &bytes).unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].label, 3);
        assert_eq!(images[1].label, 7);
        assert_eq!(images[1].pixels.len(), IMAGE_PIXELS);
        assert!(images[1].pixels.iter().all(|&p| p == 200));
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let mut bytes = record(1, 0);
        bytes.pop();
        let err = parse_batch(Path::new("short.bin"), &bytes).unwrap_err();
        assert!(matches!(err, TrainError::MalformedBatch { .. }));
    }

    #[test]
    fn test_out_of_range_label_is_malformed() {
        let err = parse_batch(Path::new("bad.bin"), &record(10, 0)).unwrap_err();
        assert!(err.to_string().contains("label 10"));
    }

    #[test]
    fn test_loads_pool_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in TRAIN_BATCH_FILES.iter().enumerate() {
            write_batch(dir.path(), name, &[record(i as u8, 0)]);
        }
        write_batch(dir.path(), TEST_BATCH_FILE, &[record(9, 0), record(8, 0)]);

        let loader = CifarLoader::new(dir.path());
        let pool = loader.load_training_pool().unwrap();
        let labels: Vec<u8> = pool.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4]);
        assert_eq!(loader.load_test_set().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_batch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), TRAIN_BATCH_FILES[0], &[record(0, 0)]);

        let err = CifarLoader::new(dir.path()).load_training_pool().unwrap_err();
        match err.downcast_ref::<TrainError>() {
            Some(TrainError::MissingBatch { path }) => {
                assert!(path.ends_with(TRAIN_BATCH_FILES[1]));
            }
            other => panic!("expected MissingBatch, got {other:?}"),
        }
    }
}
