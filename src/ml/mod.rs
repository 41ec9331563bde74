// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// The network, its optimizer wiring and the training loop.
//
//   model.rs          - LeNet: three conv/max-pool/ReLU blocks,
//                       a 500-unit ReLU hidden layer and a
//                       10-way softmax classifier
//
//   schedule.rs       - learning rate as a function of epoch
//
//   early_stopping.rs - TrainingState and its step functions
//                       (patience, best model, epoch limit)
//
//   learner.rs        - binds model + SGD + partitions behind
//                       the Learner trait
//
//   evaluator.rs      - misclassification rate on a partition,
//                       and reloading the best checkpoint
//
//   trainer.rs        - the epoch / mini-batch loop
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            LeCun et al. (1998) Gradient-Based Learning

use burn::backend::Autodiff;

/// LeNet convolutional network
pub mod model;

/// Epoch-indexed learning-rate schedule
pub mod schedule;

/// Early-stopping state machine
pub mod early_stopping;

/// Burn-backed Learner implementation
pub mod learner;

/// Partition error rate and best-model reloading
pub mod evaluator;

/// Epoch / mini-batch training loop
pub mod trainer;

/// Backend for forward passes without gradients.
#[cfg(feature = "wgpu")]
pub type ComputeBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type ComputeBackend = burn::backend::NdArray;

/// Backend used for training.
pub type TrainBackend = Autodiff<ComputeBackend>;

pub fn default_device() -> <ComputeBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}
