//! 2D convolution

use super::{expect_chw, window_extent, Layer};
use crate::manifest::OpKind;
use crate::{Result, Tensor};
use rand::Rng;
use serde_json::json;

/// 2D convolution over `[C, H, W]` activations
///
/// Weight layout is `[out_channels, in_channels / groups, kh, kw]`, bias
/// `[out_channels]`. `groups == in_channels` gives a depthwise convolution.
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    groups: usize,
    weight: Tensor,
    bias: Tensor,
}

impl Conv2d {
    /// Standard convolution (groups = 1), weights drawn uniformly from
    /// `±1/sqrt(in_channels * kh * kw)`
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: (usize, usize),
        rng: &mut impl Rng,
    ) -> Self {
        Self::init(in_channels, out_channels, kernel, 1, rng)
    }

    /// Depthwise convolution: one filter per channel (groups = channels)
    pub fn depthwise(channels: usize, kernel: (usize, usize), rng: &mut impl Rng) -> Self {
        Self::init(channels, channels, kernel, channels, rng)
    }

    fn init(
        in_channels: usize,
        out_channels: usize,
        kernel: (usize, usize),
        groups: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let in_per_group = in_channels / groups;
        let fan_in = in_per_group * kernel.0 * kernel.1;
        let bound = 1.0 / (fan_in as f32).sqrt();
        Self {
            in_channels,
            out_channels,
            kernel,
            stride: (1, 1),
            padding: (0, 0),
            groups,
            weight: Tensor::uniform(
                vec![out_channels, in_per_group, kernel.0, kernel.1],
                -bound,
                bound,
                rng,
            ),
            bias: Tensor::uniform(vec![out_channels], -bound, bound, rng),
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

    /// Output channel count
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }
}

impl Layer for Conv2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let out_shape = self.output_shape(x.shape())?;
        let (_, h, w) = expect_chw(x.shape(), self.in_channels, "conv2d")?;
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;
        let (oh, ow) = (out_shape[1], out_shape[2]);

        let in_per_group = self.in_channels / self.groups;
        let out_per_group = self.out_channels / self.groups;

        let xd = x.data();
        let wd = self.weight.data();
        let bd = self.bias.data();

        let mut out = vec![0.0f32; self.out_channels * oh * ow];
        for oc in 0..self.out_channels {
            let group = oc / out_per_group;
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = bd[oc];
                    for ic in 0..in_per_group {
                        let src_c = group * in_per_group + ic;
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
                                let xval = xd[src_c * h * w + iy * w + ix];
                                let wval = wd[((oc * in_per_group + ic) * kh + ky) * kw + kx];
                                acc += xval * wval;
                            }
                        }
                    }
                    out[oc * oh * ow + oy * ow + ox] = acc;
                }
            }
        }
        Tensor::from_vec(out, out_shape)
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let (_, h, w) = expect_chw(input, self.in_channels, "conv2d")?;
        let oh = window_extent(h, self.kernel.0, self.stride.0, self.padding.0, "conv2d")?;
        let ow = window_extent(w, self.kernel.1, self.stride.1, self.padding.1, "conv2d")?;
        Ok(vec![self.out_channels, oh, ow])
    }

    fn op_kind(&self) -> OpKind {
        OpKind::Conv2d
    }

    fn name_hint(&self) -> &'static str {
        "conv2d"
    }

    fn attrs(&self) -> serde_json::Value {
        json!({
            "in_channels": self.in_channels,
            "out_channels": self.out_channels,
            "kernel": [self.kernel.0, self.kernel.1],
            "stride": [self.stride.0, self.stride.1],
            "padding": [self.padding.0, self.padding.1],
            "groups": self.groups,
        })
    }

    fn parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.weight"), self.weight.clone()),
            (format!("{prefix}.bias"), self.bias.clone()),
        ]
    }
}
