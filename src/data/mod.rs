// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from CIFAR-10 batch files to tensor batches:
//
//   *.bin batch files
//       │
//       ▼
//   CifarLoader      → parses records into RawImages
//       │
//       ▼
//   split_validation → first K pool rows = validation, rest = train
//       │
//       ▼
//   Standardizer     → fit on train, apply to all three partitions
//       │
//       ▼
//   ImageDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher     → stacks a mini-batch into tensors
//
// Mini-batches are addressed by index and always come out in
// the same order; nothing here shuffles.

/// Reads CIFAR-10 binary batches
pub mod loader;

/// Fixed-offset train/validation split
pub mod splitter;

/// Per-feature standardization with training statistics
pub mod preprocessor;

/// Burn Dataset over standardized images, plus the three partitions
pub mod dataset;

/// Burn Batcher producing image/target tensors
pub mod batcher;
