//! Shaped tensor container for parameters and activations

use crate::{Error, Result};
use ndarray::Array1;
use rand::Rng;

/// Dense f32 tensor with an explicit shape
///
/// Data is stored flat in row-major order; a `[C, H, W]` element lives at
/// `c*H*W + h*W + w`.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Array1<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor from data and shape
    ///
    /// Fails when the element count does not match the shape product.
    pub fn new(data: Array1<f32>, shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: shape,
                got: vec![data.len()],
            });
        }
        Ok(Self { data, shape })
    }

    /// Create a tensor from a vector and shape
    pub fn from_vec(data: Vec<f32>, shape: impl Into<Vec<usize>>) -> Result<Self> {
        Self::new(Array1::from(data), shape)
    }

    /// Create a rank-1 tensor from a vector
    pub fn vector(data: Vec<f32>) -> Self {
        let shape = vec![data.len()];
        Self {
            data: Array1::from(data),
            shape,
        }
    }

    /// Create a tensor filled with a constant value
    pub fn full(shape: impl Into<Vec<usize>>, value: f32) -> Self {
        let shape = shape.into();
        let len: usize = shape.iter().product();
        Self {
            data: Array1::from_elem(len, value),
            shape,
        }
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor with elements drawn uniformly from `[low, high)`
    pub fn uniform(
        shape: impl Into<Vec<usize>>,
        low: f32,
        high: f32,
        rng: &mut impl Rng,
    ) -> Self {
        let shape = shape.into();
        let len: usize = shape.iter().product();
        let data: Vec<f32> = (0..len).map(|_| rng.random_range(low..high)).collect();
        Self {
            data: Array1::from(data),
            shape,
        }
    }

    /// Get the shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the total element count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get reference to the flat data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable reference to the flat data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Return a tensor with the same data and a new shape
    ///
    /// The element count must be preserved.
    pub fn reshape(&self, shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if self.data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: shape,
                got: self.shape.clone(),
            });
        }
        Ok(Self {
            data: self.data.clone(),
            shape,
        })
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_shape_checked() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.len(), 6);
    }

    #[test]
    fn test_new_shape_mismatch() {
        let result = Tensor::from_vec(vec![1.0, 2.0, 3.0], vec![2, 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_vector() {
        let t = Tensor::vector(vec![1.0, 2.0]);
        assert_eq!(t.shape(), &[2]);
    }

    #[test]
    fn test_zeros_ones() {
        let z = Tensor::zeros(vec![3, 2]);
        assert_eq!(z.len(), 6);
        assert!(z.data().iter().all(|&v| v == 0.0));

        let o = Tensor::ones(vec![4]);
        assert!(o.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_uniform_range_and_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        let t = Tensor::uniform(vec![100], -0.5, 0.5, &mut rng);
        assert!(t.data().iter().all(|&v| (-0.5..0.5).contains(&v)));

        let mut rng2 = StdRng::seed_from_u64(42);
        let t2 = Tensor::uniform(vec![100], -0.5, 0.5, &mut rng2);
        assert_eq!(t.data(), t2.data());
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![4]).unwrap();
        let r = t.reshape(vec![2, 2]).unwrap();
        assert_eq!(r.shape(), &[2, 2]);
        assert_eq!(r.data(), t.data());

        assert!(t.reshape(vec![3]).is_err());
    }

    #[test]
    fn test_row_major_indexing() {
        // [C=2, H=2, W=3] layout: element (c, h, w) at c*6 + h*3 + w
        let t = Tensor::from_vec((0..12).map(|i| i as f32).collect(), vec![2, 2, 3]).unwrap();
        assert_eq!(t.data()[1 * 6 + 1 * 3 + 2], 11.0);
        assert_eq!(t.data()[0 * 6 + 1 * 3 + 0], 3.0);
    }
}
