//! Dense vector value type used for similarity search.

use serde::{Deserialize, Serialize};

use crate::error::{FathomError, Result};

/// A dense vector of 32-bit floats.
///
/// Embeddings are expected to be L2-normalized to unit length before they
/// enter an index, so that inner product equals cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// The vector components.
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector with the given components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Calculate the L2 norm (magnitude) of this vector.
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalize this vector to unit length.
    ///
    /// A zero vector is left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.data {
                *value /= norm;
            }
        }
    }

    /// Get a normalized copy of this vector.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized
    }

    /// Inner product with another vector of the same dimension.
    ///
    /// For unit-normalized inputs this is the cosine similarity.
    pub fn dot(&self, other: &Vector) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Check if this vector contains any NaN or infinite values.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Validate that this vector has the expected dimension.
    pub fn validate_dimension(&self, expected: usize) -> Result<()> {
        if self.data.len() != expected {
            return Err(FathomError::dimension_mismatch(expected, self.data.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_creation() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_norm_and_normalize() {
        let mut v = Vector::new(vec![3.0, 4.0]);
        assert!((v.norm() - 5.0).abs() < 1e-6);

        v.normalize();
        assert!((v.norm() - 1.0).abs() < 1e-6);
        assert!((v.data[0] - 0.6).abs() < 1e-6);
        assert!((v.data[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = Vector::new(vec![0.0, 0.0]);
        v.normalize();
        assert_eq!(v.data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_dot_product() {
        let a = Vector::new(vec![1.0, 0.0, 0.0]);
        let b = Vector::new(vec![0.0, 1.0, 0.0]);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.dot(&a), 1.0);
    }

    #[test]
    fn test_unit_dot_is_cosine() {
        let a = Vector::new(vec![1.0, 1.0]).normalized();
        let b = Vector::new(vec![1.0, 0.0]);
        let cos = a.dot(&b);
        assert!((cos - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_is_valid() {
        assert!(Vector::new(vec![1.0, -2.0]).is_valid());
        assert!(!Vector::new(vec![f32::NAN]).is_valid());
        assert!(!Vector::new(vec![f32::INFINITY]).is_valid());
    }

    #[test]
    fn test_validate_dimension() {
        let v = Vector::new(vec![1.0, 2.0]);
        assert!(v.validate_dimension(2).is_ok());
        assert!(matches!(
            v.validate_dimension(3),
            Err(crate::error::FathomError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
