//! Parameterless layers: activations and flatten

use super::Layer;
use crate::manifest::OpKind;
use crate::{Error, Result, Tensor};

/// Rectified linear unit, elementwise
pub struct ReLU;

impl Layer for ReLU {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let data: Vec<f32> = x.data().iter().map(|&v| v.max(0.0)).collect();
        Tensor::from_vec(data, x.shape().to_vec())
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        Ok(input.to_vec())
    }

    fn op_kind(&self) -> OpKind {
        OpKind::Relu
    }

    fn name_hint(&self) -> &'static str {
        "relu"
    }
}

/// Softmax over a flat feature vector
///
/// Max-subtraction keeps the exponentials finite for any finite input.
pub struct Softmax;

impl Layer for Softmax {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if x.shape().len() != 1 || x.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "softmax expects a non-empty flat input, got {:?}",
                x.shape()
            )));
        }
        let max = x.data().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = x.data().iter().map(|&v| (v - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        Tensor::from_vec(exp.into_iter().map(|v| v / sum).collect(), x.shape().to_vec())
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        if input.len() != 1 || input[0] == 0 {
            return Err(Error::InvalidParameter(format!(
                "softmax expects a non-empty flat input, got {input:?}"
            )));
        }
        Ok(input.to_vec())
    }

    fn op_kind(&self) -> OpKind {
        OpKind::Softmax
    }

    fn name_hint(&self) -> &'static str {
        "softmax"
    }
}

/// Collapse any shape to a flat feature vector
pub struct Flatten;

impl Layer for Flatten {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        x.reshape(vec![x.len()])
    }

    fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        if input.is_empty() {
            return Err(Error::InvalidParameter(
                "flatten on rank-0 input".to_string(),
            ));
        }
        Ok(vec![input.iter().product()])
    }

    fn op_kind(&self) -> OpKind {
        OpKind::Flatten
    }

    fn name_hint(&self) -> &'static str {
        "flatten"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu() {
        let x = Tensor::vector(vec![-1.0, 0.0, 2.5]);
        let y = ReLU.forward(&x).unwrap();
        assert_eq!(y.data().as_slice().unwrap(), &[0.0, 0.0, 2.5]);
    }

    #[test]
    fn test_relu_preserves_spatial_shape() {
        let x = Tensor::zeros(vec![2, 3, 3]);
        let y = ReLU.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 3, 3]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let x = Tensor::vector(vec![1.0, 2.0, 3.0]);
        let y = Softmax.forward(&x).unwrap();
        let sum: f32 = y.data().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        // monotone: larger logit, larger probability
        assert!(y.data()[2] > y.data()[1]);
        assert!(y.data()[1] > y.data()[0]);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let x = Tensor::vector(vec![1000.0, 1000.0]);
        let y = Softmax.forward(&x).unwrap();
        assert!(y.data().iter().all(|v| v.is_finite()));
        assert_relative_eq!(y.data()[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_softmax_rejects_spatial_input() {
        let x = Tensor::zeros(vec![2, 2, 2]);
        assert!(Softmax.forward(&x).is_err());
    }

    #[test]
    fn test_flatten() {
        let x = Tensor::zeros(vec![32, 7, 7]);
        let y = Flatten.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1568]);
        assert_eq!(Flatten.output_shape(&[32, 7, 7]).unwrap(), vec![1568]);
    }
}
