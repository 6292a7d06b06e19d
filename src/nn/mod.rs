//! Inference layers for the network fixtures
//!
//! The fixtures are exported with freshly initialized weights; layers
//! therefore implement the forward pass and static shape inference only.
//! Activations are single-example: `[C, H, W]` for spatial layers, `[F]`
//! for flat ones. The dynamic batch axis exists only in the exported
//! signature.

mod conv;
mod linear;
mod norm;
mod ops;
mod pool;
mod sequential;

pub use conv::Conv2d;
pub use linear::Linear;
pub use norm::BatchNorm2d;
pub use ops::{Flatten, ReLU, Softmax};
pub use pool::{AvgPool2d, GlobalAvgPool2d, MaxPool2d};
pub use sequential::Sequential;

use crate::manifest::OpKind;
use crate::{Result, Tensor};

/// A single inference layer
pub trait Layer {
    /// Forward pass on a single example
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// Static shape inference; must agree with `forward` for every valid
    /// input shape
    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>>;

    /// Operator kind recorded in the graph manifest
    fn op_kind(&self) -> OpKind;

    /// Stem used for node naming (`conv2d` -> `conv2d1`, `conv2d2`, ...)
    fn name_hint(&self) -> &'static str;

    /// Operator attributes recorded in the graph manifest
    fn attrs(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Named parameter tensors, prefixed with the node name
    fn parameters(&self, _prefix: &str) -> Vec<(String, Tensor)> {
        Vec::new()
    }
}

/// Require a `[C, H, W]` input with the expected channel count
pub(crate) fn expect_chw(input: &[usize], channels: usize, op: &str) -> Result<(usize, usize, usize)> {
    if input.len() != 3 {
        return Err(crate::Error::InvalidParameter(format!(
            "{op} expects a [C, H, W] input, got {input:?}"
        )));
    }
    if input[0] != channels {
        return Err(crate::Error::ShapeMismatch {
            expected: vec![channels, input[1], input[2]],
            got: input.to_vec(),
        });
    }
    Ok((input[0], input[1], input[2]))
}

/// Output extent of a strided window op along one axis
pub(crate) fn window_extent(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    op: &str,
) -> Result<usize> {
    let padded = input + 2 * padding;
    if kernel == 0 || stride == 0 {
        return Err(crate::Error::InvalidParameter(format!(
            "{op}: kernel and stride must be non-zero"
        )));
    }
    if padded < kernel {
        return Err(crate::Error::InvalidParameter(format!(
            "{op}: kernel {kernel} larger than padded input {padded}"
        )));
    }
    Ok((padded - kernel) / stride + 1)
}
