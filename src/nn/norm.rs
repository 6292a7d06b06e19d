//! Batch normalization (inference form)

use super::{expect_chw, Layer};
use crate::manifest::OpKind;
use crate::{Result, Tensor};
use serde_json::json;

/// Per-channel batch normalization over `[C, H, W]` activations
///
/// Inference-only: normalizes with the stored running statistics. Fresh
/// layers carry identity statistics (`gamma = 1`, `beta = 0`, `mean = 0`,
/// `var = 1`), the state a never-trained exporter writes.
pub struct BatchNorm2d {
    num_features: usize,
    epsilon: f32,
    gamma: Tensor,
    beta: Tensor,
    running_mean: Tensor,
    running_var: Tensor,
}

impl BatchNorm2d {
    /// Create a layer with identity statistics
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            epsilon: 1e-5,
            gamma: Tensor::ones(vec![num_features]),
            beta: Tensor::zeros(vec![num_features]),
            running_mean: Tensor::zeros(vec![num_features]),
            running_var: Tensor::ones(vec![num_features]),
        }
    }

    /// Set epsilon
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl Layer for BatchNorm2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (c, h, w) = expect_chw(x.shape(), self.num_features, "batch_norm2d")?;
        let xd = x.data();
        let gamma = self.gamma.data();
        let beta = self.beta.data();
        let mean = self.running_mean.data();
        let var = self.running_var.data();

        let mut out = vec![0.0f32; c * h * w];
        for ch in 0..c {
            let scale = gamma[ch] / (var[ch] + self.epsilon).sqrt();
            let shift = beta[ch] - mean[ch] * scale;
            let base = ch * h * w;
            for i in 0..h * w {
                out[base + i] = xd[base + i] * scale + shift;
            }
        }
        Tensor::from_vec(out, x.shape().to_vec())
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let _ = expect_chw(input, self.num_features, "batch_norm2d")?;
        Ok(input.to_vec())
    }

    fn op_kind(&self) -> OpKind {
        OpKind::BatchNorm2d
    }

    fn name_hint(&self) -> &'static str {
        "batchnormalization"
    }

    fn attrs(&self) -> serde_json::Value {
        json!({
            "num_features": self.num_features,
            "epsilon": self.epsilon,
        })
    }

    fn parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        vec![
            (format!("{prefix}.gamma"), self.gamma.clone()),
            (format!("{prefix}.beta"), self.beta.clone()),
            (format!("{prefix}.running_mean"), self.running_mean.clone()),
            (format!("{prefix}.running_var"), self.running_var.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_statistics_pass_through() {
        let bn = BatchNorm2d::new(2);
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 1, 2]).unwrap();
        let y = bn.forward(&x).unwrap();
        for i in 0..4 {
            assert_relative_eq!(y.data()[i], x.data()[i], epsilon = 1e-4);
        }
    }

    #[test]
    fn test_normalization_with_stats() {
        let mut bn = BatchNorm2d::new(1).with_epsilon(0.0);
        bn.running_mean = Tensor::vector(vec![2.0]);
        bn.running_var = Tensor::vector(vec![4.0]);
        bn.gamma = Tensor::vector(vec![3.0]);
        bn.beta = Tensor::vector(vec![1.0]);

        // (4 - 2) / 2 * 3 + 1 = 4
        let x = Tensor::from_vec(vec![4.0], vec![1, 1, 1]).unwrap();
        let y = bn.forward(&x).unwrap();
        assert_relative_eq!(y.data()[0], 4.0);
    }

    #[test]
    fn test_rejects_wrong_channels() {
        let bn = BatchNorm2d::new(3);
        let x = Tensor::zeros(vec![2, 2, 2]);
        assert!(bn.forward(&x).is_err());
    }

    #[test]
    fn test_parameters_named() {
        let bn = BatchNorm2d::new(4);
        let params = bn.parameters("batchnormalization1");
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].0, "batchnormalization1.gamma");
        assert!(params.iter().all(|(_, t)| t.shape() == [4]));
    }
}
