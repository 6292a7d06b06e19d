//! Spatial pooling layers

use super::{expect_chw, window_extent, Layer};
use crate::manifest::OpKind;
use crate::{Error, Result, Tensor};
use serde_json::json;

/// Max pooling over `[C, H, W]` activations
///
/// Stride defaults to the kernel size. Padded positions never win the max.
pub struct MaxPool2d {
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
}

impl MaxPool2d {
    /// Create a pool with stride equal to the kernel
    pub fn new(kernel: (usize, usize)) -> Self {
        Self {
            kernel,
            stride: kernel,
            padding: (0, 0),
        }
    }

    /// Set the stride
    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    /// Set the zero padding
    pub fn with_padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }
}

impl Layer for MaxPool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let out_shape = self.output_shape(x.shape())?;
        let (c, h, w) = expect_chw(x.shape(), x.shape()[0], "max_pool2d")?;
        pool(
            x,
            c,
            h,
            w,
            out_shape,
            self.kernel,
            self.stride,
            self.padding,
            PoolMode::Max,
        )
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        window_shape(input, self.kernel, self.stride, self.padding, "max_pool2d")
    }

    fn op_kind(&self) -> OpKind {
        OpKind::MaxPool2d
    }

    fn name_hint(&self) -> &'static str {
        "maxpool2d"
    }

    fn attrs(&self) -> serde_json::Value {
        json!({
            "kernel": [self.kernel.0, self.kernel.1],
            "stride": [self.stride.0, self.stride.1],
            "padding": [self.padding.0, self.padding.1],
        })
    }
}

/// Average pooling over `[C, H, W]` activations
///
/// Padded positions count toward the divisor (the window size is the fixed
/// denominator), matching the exporter defaults the fixtures were built
/// against.
pub struct AvgPool2d {
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
}

impl AvgPool2d {
    /// Create a pool with stride equal to the kernel
    pub fn new(kernel: (usize, usize)) -> Self {
        Self {
            kernel,
            stride: kernel,
            padding: (0, 0),
        }
    }

    /// Set the stride
    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    /// Set the zero padding
    pub fn with_padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }
}

impl Layer for AvgPool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let out_shape = self.output_shape(x.shape())?;
        let (c, h, w) = expect_chw(x.shape(), x.shape()[0], "avg_pool2d")?;
        pool(
            x,
            c,
            h,
            w,
            out_shape,
            self.kernel,
            self.stride,
            self.padding,
            PoolMode::Avg,
        )
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        window_shape(input, self.kernel, self.stride, self.padding, "avg_pool2d")
    }

    fn op_kind(&self) -> OpKind {
        OpKind::AvgPool2d
    }

    fn name_hint(&self) -> &'static str {
        "averagepool2d"
    }

    fn attrs(&self) -> serde_json::Value {
        json!({
            "kernel": [self.kernel.0, self.kernel.1],
            "stride": [self.stride.0, self.stride.1],
            "padding": [self.padding.0, self.padding.1],
        })
    }
}

/// Adaptive average pooling to a single spatial cell: `[C, H, W] -> [C, 1, 1]`
#[derive(Default)]
pub struct GlobalAvgPool2d;

impl GlobalAvgPool2d {
    /// Create the layer
    pub fn new() -> Self {
        Self
    }
}

impl Layer for GlobalAvgPool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let channels = x.shape().first().copied().unwrap_or(0);
        let (c, h, w) = expect_chw(x.shape(), channels, "global_avg_pool2d")?;
        if h * w == 0 {
            return Err(Error::InvalidParameter(
                "global_avg_pool2d on empty spatial extent".to_string(),
            ));
        }
        let xd = x.data();
        let area = (h * w) as f32;
        let mut out = vec![0.0f32; c];
        for (ch, slot) in out.iter_mut().enumerate() {
            let base = ch * h * w;
            let mut acc = 0.0f32;
            for i in 0..h * w {
                acc += xd[base + i];
            }
            *slot = acc / area;
        }
        Tensor::from_vec(out, vec![c, 1, 1])
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let (c, _, _) = expect_chw(input, input.first().copied().unwrap_or(0), "global_avg_pool2d")?;
        Ok(vec![c, 1, 1])
    }

    fn op_kind(&self) -> OpKind {
        OpKind::GlobalAvgPool2d
    }

    fn name_hint(&self) -> &'static str {
        "globalavgpool2d"
    }
}

enum PoolMode {
    Max,
    Avg,
}

fn window_shape(
    input: &[usize],
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    op: &str,
) -> Result<Vec<usize>> {
    let (c, h, w) = expect_chw(input, input.first().copied().unwrap_or(0), op)?;
    let oh = window_extent(h, kernel.0, stride.0, padding.0, op)?;
    let ow = window_extent(w, kernel.1, stride.1, padding.1, op)?;
    Ok(vec![c, oh, ow])
}

#[allow(clippy::too_many_arguments)]
fn pool(
    x: &Tensor,
    c: usize,
    h: usize,
    w: usize,
    out_shape: Vec<usize>,
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    mode: PoolMode,
) -> Result<Tensor> {
    let (kh, kw) = kernel;
    let (sh, sw) = stride;
    let (ph, pw) = padding;
    let (oh, ow) = (out_shape[1], out_shape[2]);
    let xd = x.data();

    let mut out = vec![0.0f32; c * oh * ow];
    for ch in 0..c {
        for oy in 0..oh {
            for ox in 0..ow {
                let mut max = f32::NEG_INFINITY;
                let mut sum = 0.0f32;
                for ky in 0..kh {
                    let iy = oy * sh + ky;
                    if iy < ph || iy - ph >= h {
                        continue;
                    }
                    let iy = iy - ph;
                    for kx in 0..kw {
                        let ix = ox * sw + kx;
                        if ix < pw || ix - pw >= w {
                            continue;
                        }
                        let ix = ix - pw;
                        let v = xd[ch * h * w + iy * w + ix];
                        if v > max {
                            max = v;
                        }
                        sum += v;
                    }
                }
                out[ch * oh * ow + oy * ow + ox] = match mode {
                    PoolMode::Max => max,
                    PoolMode::Avg => sum / (kh * kw) as f32,
                };
            }
        }
    }
    Tensor::from_vec(out, out_shape)
}
