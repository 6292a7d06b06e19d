//! Fully connected layer

use super::Layer;
use crate::manifest::OpKind;
use crate::{Error, Result, Tensor};
use rand::Rng;
use serde_json::json;

/// Fully connected layer: `y = W x + b`
///
/// Weight layout is `[out_features, in_features]`, bias `[out_features]`.
pub struct Linear {
    in_features: usize,
    out_features: usize,
    weight: Tensor,
    bias: Tensor,
}

impl Linear {
    /// Create a layer with weights drawn uniformly from
    /// `±1/sqrt(in_features)`
    pub fn new(in_features: usize, out_features: usize, rng: &mut impl Rng) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        Self {
            in_features,
            out_features,
            weight: Tensor::uniform(vec![out_features, in_features], -bound, bound, rng),
            bias: Tensor::uniform(vec![out_features], -bound, bound, rng),
        }
    }

    /// Create a layer from existing weight and bias tensors
    pub fn from_parts(weight: Tensor, bias: Tensor) -> Result<Self> {
        if weight.shape().len() != 2 {
            return Err(Error::InvalidParameter(format!(
                "linear weight must be rank 2, got {:?}",
                weight.shape()
            )));
        }
        let (out_features, in_features) = (weight.shape()[0], weight.shape()[1]);
        if bias.shape() != [out_features] {
            return Err(Error::ShapeMismatch {
                expected: vec![out_features],
                got: bias.shape().to_vec(),
            });
        }
        Ok(Self {
            in_features,
            out_features,
            weight,
            bias,
        })
    }

    /// Input feature count
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Output feature count
    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Layer for Linear {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if x.shape() != [self.in_features] {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_features],
                got: x.shape().to_vec(),
            });
        }
        let xd = x.data();
        let wd = self.weight.data();
        let bd = self.bias.data();

        let mut out = vec![0.0f32; self.out_features];
        for (o, slot) in out.iter_mut().enumerate() {
            let mut acc = bd[o];
            let row = o * self.in_features;
            for i in 0..self.in_features {
                acc += wd[row + i] * xd[i];
            }
            *slot = acc;
        }
        Ok(Tensor::vector(out))
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        if input != [self.in_features] {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_features],
                got: input.to_vec(),
            });
        }
        Ok(vec![self.out_features])
    }

    fn op_kind(&self) -> OpKind {
        OpKind::Linear
    }

    fn name_hint(&self) -> &'static str {
        "linear"
    }

    fn attrs(&self) -> serde_json::Value {
        json!({
            "in_features": self.in_features,
            "out_features": self.out_features,
        })
    }

    fn parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.weight"), self.weight.clone()),
            (format!("{prefix}.bias"), self.bias.clone()),
        ]
    }
}
