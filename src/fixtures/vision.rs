//! Vision fixtures
//!
//! Three small convolutional networks with seeded random weights, exported
//! at the current opset. The stacks follow well-known shapes: a two-conv
//! classifier for 28x28 grayscale input, a strided conv stack in the
//! residual-network style (plain, no skip connections), and a
//! depthwise-separable stack in the mobile style.

use super::{network_model, Fixture};
use crate::io::Model;
use crate::manifest::DEFAULT_OPSET;
use crate::nn::{
    BatchNorm2d, Conv2d, Flatten, GlobalAvgPool2d, Linear, MaxPool2d, ReLU, Sequential,
};
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SIMPLE_CNN_SEED: u64 = 28;
const TINY_RESNET_SEED: u64 = 224;
const TINY_MOBILENET_SEED: u64 = 225;

/// Lightweight CNN: 28x28 grayscale -> 10 classes
pub fn build_simple_cnn() -> Result<Model> {
    let mut rng = StdRng::seed_from_u64(SIMPLE_CNN_SEED);
    let net = Sequential::new()
        .add(Conv2d::new(1, 16, (3, 3), &mut rng).with_padding((1, 1))) // 28x28x16
        .add(ReLU)
        .add(MaxPool2d::new((2, 2))) // 14x14x16
        .add(Conv2d::new(16, 32, (3, 3), &mut rng).with_padding((1, 1))) // 14x14x32
        .add(ReLU)
        .add(MaxPool2d::new((2, 2))) // 7x7x32
        .add(Flatten)
        .add(Linear::new(7 * 7 * 32, 128, &mut rng))
        .add(ReLU)
        .add(Linear::new(128, 10, &mut rng));

    network_model(
        &net,
        Fixture::SimpleCnn.base_name(),
        "cnn",
        &[1, 28, 28],
        DEFAULT_OPSET,
    )
}

/// Small conv stack in the residual-network style: 224x224 RGB -> 1000
pub fn build_tiny_resnet() -> Result<Model> {
    let mut rng = StdRng::seed_from_u64(TINY_RESNET_SEED);
    let mut net = Sequential::new()
        .add(Conv2d::new(3, 64, (7, 7), &mut rng).with_stride((2, 2)).with_padding((3, 3)))
        .add(BatchNorm2d::new(64))
        .add(ReLU)
        .add(MaxPool2d::new((3, 3)).with_stride((2, 2)).with_padding((1, 1)));

    net = conv_stage(net, 64, 64, 1, &mut rng);
    net = conv_stage(net, 64, 128, 2, &mut rng);
    net = conv_stage(net, 128, 256, 2, &mut rng);

    let net = net
        .add(GlobalAvgPool2d::new())
        .add(Flatten)
        .add(Linear::new(256, 1000, &mut rng));

    network_model(
        &net,
        Fixture::TinyResNet.base_name(),
        "resnet",
        &[3, 224, 224],
        DEFAULT_OPSET,
    )
}

/// Two conv-norm-relu blocks; the first may downsample
fn conv_stage(
    net: Sequential,
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    rng: &mut StdRng,
) -> Sequential {
    net.add(
        Conv2d::new(in_channels, out_channels, (3, 3), rng)
            .with_stride((stride, stride))
            .with_padding((1, 1)),
    )
    .add(BatchNorm2d::new(out_channels))
    .add(ReLU)
    .add(Conv2d::new(out_channels, out_channels, (3, 3), rng).with_padding((1, 1)))
    .add(BatchNorm2d::new(out_channels))
    .add(ReLU)
}

/// Depthwise-separable CNN: 224x224 RGB -> 1000 classes
pub fn build_tiny_mobilenet() -> Result<Model> {
    let mut rng = StdRng::seed_from_u64(TINY_MOBILENET_SEED);
    let net = Sequential::new()
        .add(Conv2d::new(3, 32, (3, 3), &mut rng).with_stride((2, 2)).with_padding((1, 1)))
        .add(BatchNorm2d::new(32))
        .add(ReLU)
        // depthwise separable block: per-channel filter then 1x1 pointwise
        .add(Conv2d::depthwise(32, (3, 3), &mut rng).with_padding((1, 1)))
        .add(BatchNorm2d::new(32))
        .add(ReLU)
        .add(Conv2d::new(32, 64, (1, 1), &mut rng))
        .add(BatchNorm2d::new(64))
        .add(ReLU)
        .add(Conv2d::depthwise(64, (3, 3), &mut rng).with_stride((2, 2)).with_padding((1, 1)))
        .add(BatchNorm2d::new(64))
        .add(ReLU)
        .add(Conv2d::new(64, 128, (1, 1), &mut rng))
        .add(BatchNorm2d::new(128))
        .add(ReLU)
        .add(GlobalAvgPool2d::new())
        .add(Flatten)
        .add(Linear::new(128, 1000, &mut rng));

    network_model(
        &net,
        Fixture::TinyMobileNet.base_name(),
        "mobilenet",
        &[3, 224, 224],
        DEFAULT_OPSET,
    )
}
