// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// The training loop itself is written against the traits in
// `traits.rs`, so its control logic can be exercised without
// a tensor backend.

// Raw and standardized CIFAR images plus the fixed image geometry
pub mod image;

// Append-only training log and the best-model triple
pub mod records;

// Typed failures of a training run
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
