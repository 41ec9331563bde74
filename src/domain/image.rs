// ============================================================
// Layer 3: Image Domain Types
// ============================================================
// A CIFAR-10 image is 3 colour planes of 32x32 pixels stored
// channel-major: 1024 red bytes, then 1024 green, then 1024 blue.
// That is already the [channels, height, width] order a 2-D
// convolution expects, so pixels are never transposed.

/// Colour planes per image.
pub const IMAGE_CHANNELS: usize = 3;
/// Pixel rows per plane.
pub const IMAGE_HEIGHT: usize = 32;
/// Pixel columns per plane.
pub const IMAGE_WIDTH: usize = 32;
/// Values per image, i.e. the feature count used for standardization.
pub const IMAGE_PIXELS: usize = IMAGE_CHANNELS * IMAGE_HEIGHT * IMAGE_WIDTH;
/// Number of CIFAR-10 classes.
pub const NUM_CLASSES: usize = 10;

/// One record exactly as read from a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Class label in `0..NUM_CLASSES`
    pub label: u8,

    /// `IMAGE_PIXELS` bytes, channel-major
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(label: u8, pixels: Vec<u8>) -> Self {
        Self { label, pixels }
    }
}

/// A standardized image, ready to be stacked into a batch tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    /// `IMAGE_PIXELS` standardized features, channel-major
    pub pixels: Vec<f32>,

    /// Class label in `0..NUM_CLASSES`
    pub label: usize,
}

impl LabeledImage {
    pub fn new(pixels: Vec<f32>, label: usize) -> Self {
        Self { pixels, label }
    }
}
