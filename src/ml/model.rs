use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::error::TrainError;

/// Square kernel side of each convolution block.
pub const KERNEL_SIZES: [usize; 3] = [5, 5, 2];
/// Non-overlapping max-pool window side.
pub const POOL_SIZE: usize = 2;
/// Coefficient of the sum-of-squared-weights penalty.
pub const L2_REG: f64 = 0.01;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LeNetConfig {
    /// Output feature maps of each convolution block
    pub kernel_counts:  Vec<usize>,
    #[config(default = 3)]
    pub input_channels: usize,
    #[config(default = 32)]
    pub image_size:     usize,
    #[config(default = 500)]
    pub hidden_units:   usize,
    #[config(default = 10)]
    pub num_classes:    usize,
    #[config(default = 23455)]
    pub seed:           u64,
}

/// Geometry of one convolution block, derived from the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    pub in_channels:  usize,
    pub out_channels: usize,
    pub kernel:       usize,
    /// side of the square input feature map
    pub input_size:   usize,
    /// side after pooling
    pub output_size:  usize,
}

impl BlockShape {
    /// Uniform bound √(6 / (fan_in + fan_out)); fan_out is divided by
    /// the pool area because each pooled unit sees one gradient per window.
    pub fn init_bound(&self) -> f64 {
        let fan_in = self.in_channels * self.kernel * self.kernel;
        let fan_out = self.out_channels * self.kernel * self.kernel / (POOL_SIZE * POOL_SIZE);
        (6.0 / (fan_in + fan_out) as f64).sqrt()
    }

    fn init<B: Backend>(&self, rng: &mut StdRng, device: &B::Device) -> ConvPoolBlock<B> {
        let mut conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel, self.kernel],
        )
        .init(device);

        conv.weight = Param::from_tensor(uniform_tensor(
            rng,
            [self.out_channels, self.in_channels, self.kernel, self.kernel],
            self.init_bound(),
            device,
        ));
        conv.bias = Some(Param::from_tensor(Tensor::zeros([self.out_channels], device)));

        let pool = MaxPool2dConfig::new([POOL_SIZE, POOL_SIZE])
            .with_strides([POOL_SIZE, POOL_SIZE])
            .init();

        ConvPoolBlock { conv, pool }
    }
}

impl LeNetConfig {
    /// Walk the convolution stack and compute every block's geometry,
    /// failing if any feature map would shrink below its kernel or pool.
    pub fn block_shapes(&self) -> Result<Vec<BlockShape>, TrainError> {
        if self.kernel_counts.len() != KERNEL_SIZES.len() {
            return Err(TrainError::InvalidConfig(format!(
                "expected {} kernel counts, got {}",
                KERNEL_SIZES.len(),
                self.kernel_counts.len()
            )));
        }

        let mut channels = self.input_channels;
        let mut size = self.image_size;
        let mut shapes = Vec::with_capacity(KERNEL_SIZES.len());

        for (i, (&out, &kernel)) in self.kernel_counts.iter().zip(&KERNEL_SIZES).enumerate() {
            if out == 0 {
                return Err(TrainError::InvalidConfig(format!("conv{i} has zero kernels")));
            }
            if size < kernel || (size - kernel + 1) < POOL_SIZE {
                return Err(TrainError::ShapeMismatch {
                    layer:    format!("conv{i}"),
                    expected: format!("feature map of at least {}x{}", kernel + POOL_SIZE - 1, kernel + POOL_SIZE - 1),
                    found:    format!("{size}x{size}"),
                });
            }

            let output_size = (size - kernel + 1) / POOL_SIZE;
            shapes.push(BlockShape {
                in_channels: channels,
                out_channels: out,
                kernel,
                input_size: size,
                output_size,
            });
            channels = out;
            size = output_size;
        }

        Ok(shapes)
    }

    /// Width of the flattened convolution output fed to the hidden layer.
    pub fn flattened_features(&self) -> Result<usize, TrainError> {
        let shapes = self.block_shapes()?;
        Ok(shapes
            .last()
            .map(|s| s.out_channels * s.output_size * s.output_size)
            .unwrap_or(0))
    }

    /// Build the network with seeded weights and zero biases.
    /// The classifier starts at zero, as a logistic regression would.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<LeNet<B>, TrainError> {
        let shapes = self.block_shapes()?;
        let features = self.flattened_features()?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let blocks = shapes.iter().map(|s| s.init(&mut rng, device)).collect();

        let mut hidden = LinearConfig::new(features, self.hidden_units).init(device);
        let bound = (6.0 / (features + self.hidden_units) as f64).sqrt();
        hidden.weight = Param::from_tensor(uniform_tensor(
            &mut rng,
            [features, self.hidden_units],
            bound,
            device,
        ));
        hidden.bias = Some(Param::from_tensor(Tensor::zeros([self.hidden_units], device)));

        let mut classifier = LinearConfig::new(self.hidden_units, self.num_classes).init(device);
        classifier.weight = Param::from_tensor(Tensor::zeros([self.hidden_units, self.num_classes], device));
        classifier.bias = Some(Param::from_tensor(Tensor::zeros([self.num_classes], device)));

        Ok(LeNet { blocks, hidden, classifier })
    }
}

fn uniform_tensor<B: Backend, const D: usize>(
    rng:    &mut StdRng,
    shape:  [usize; D],
    bound:  f64,
    device: &B::Device,
) -> Tensor<B, D> {
    let total: usize = shape.iter().product();
    let values: Vec<f32> = (0..total)
        .map(|_| rng.gen_range(-bound..bound) as f32)
        .collect();

    Tensor::<B, D>::from_floats(TensorData::new(values, shape), device)
}

/// convolution → max-pool → ReLU
#[derive(Module, Debug)]
pub struct ConvPoolBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvPoolBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.pool.forward(self.conv.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct LeNet<B: Backend> {
    pub blocks:     Vec<ConvPoolBlock<B>>,
    pub hidden:     Linear<B>,
    pub classifier: Linear<B>,
}

impl<B: Backend> LeNet<B> {
    /// images: [batch, channels, height, width] → class scores [batch, classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = x.flatten::<2>(1, 3);
        let x = relu(self.hidden.forward(x));
        self.classifier.forward(x)
    }

    /// Softmax class probabilities, [batch, classes].
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Σ w² over every weight tensor; biases are not penalised.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let hidden = self.hidden.weight.val().powf_scalar(2.0).sum();
        let classifier = self.classifier.weight.val().powf_scalar(2.0).sum();

        self.blocks
            .iter()
            .map(|b| b.conv.weight.val().powf_scalar(2.0).sum())
            .fold(hidden + classifier, |acc, w| acc + w)
    }

    /// Mean negative log-likelihood of the targets plus `L2_REG` × penalty.
    pub fn forward_loss(&self, images: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let logits = self.forward(images);
        let nll = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);

        nll + self.l2_penalty().mul_scalar(L2_REG)
    }

    /// Number of misclassified images in the batch.
    pub fn count_errors(&self, images: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> usize {
        let total = targets.dims()[0];
        // argmax(1) returns [batch, 1]; flatten before comparing with [batch]
        let predicted = self.forward(images).argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predicted
            .equal(targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        total.saturating_sub(correct as usize)
    }

    /// Fail before the first forward pass if an input of `dims`
    /// ([batch, channels, height, width]) cannot flow through the network.
    pub fn check_input(&self, dims: [usize; 4]) -> Result<(), TrainError> {
        let [_, mut channels, height, width] = dims;
        if height != width {
            return Err(TrainError::ShapeMismatch {
                layer:    "input".to_string(),
                expected: "square images".to_string(),
                found:    format!("{height}x{width}"),
            });
        }
        let mut size = height;

        for (i, block) in self.blocks.iter().enumerate() {
            let [out, filter_channels, kh, _] = block.conv.weight.dims();
            if filter_channels != channels {
                return Err(TrainError::ShapeMismatch {
                    layer:    format!("conv{i}"),
                    expected: format!("{filter_channels} input channels"),
                    found:    format!("{channels}"),
                });
            }
            if size < kh || (size - kh + 1) < POOL_SIZE {
                return Err(TrainError::ShapeMismatch {
                    layer:    format!("conv{i}"),
                    expected: format!("feature map of at least {}x{}", kh + POOL_SIZE - 1, kh + POOL_SIZE - 1),
                    found:    format!("{size}x{size}"),
                });
            }
            size = (size - kh + 1) / POOL_SIZE;
            channels = out;
        }

        let [hidden_in, _] = self.hidden.weight.dims();
        let flattened = channels * size * size;
        if hidden_in != flattened {
            return Err(TrainError::ShapeMismatch {
                layer:    "hidden".to_string(),
                expected: format!("{hidden_in} input features"),
                found:    format!("{flattened}"),
            });
        }
        Ok(())
    }
}
