// argus_core/src/distr.rs

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// --- DISTRIBUTION TRAIT ---
// The contract a propagated state distribution must satisfy. A Markov process
// may return any distribution; the filter only accepts Gaussians unless it is
// configured to moment-match everything else.
pub trait Distr: Debug {
    /// The mean vector of the distribution.
    fn mean(&self) -> &DVector<f64>;

    /// The covariance matrix of the distribution.
    fn cov(&self) -> &DMatrix<f64>;

    /// The dimension of the underlying variable.
    fn dim(&self) -> usize {
        self.mean().nrows()
    }

    /// Returns `Some` if this distribution actually is Gaussian.
    fn as_gaussian(&self) -> Option<&GaussianDistr> {
        None
    }
}

/// A multivariate normal distribution over a real-valued state vector.
///
/// The covariance is kept in agreement with the mean's dimension at all
/// times; both constructors check the shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianDistr {
    mean: DVector<f64>,
    cov: DMatrix<f64>,
}

impl GaussianDistr {
    /// Creates a Gaussian from a mean vector and covariance matrix.
    ///
    /// # Panics
    /// Panics if `cov` is not square with side `mean.len()`.
    pub fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> Self {
        assert_eq!(mean.nrows(), cov.nrows(), "mean/covariance row mismatch");
        assert_eq!(cov.nrows(), cov.ncols(), "covariance must be square");
        Self { mean, cov }
    }

    /// A one-dimensional Gaussian.
    pub fn scalar(mean: f64, var: f64) -> Self {
        Self::new(DVector::from_element(1, mean), DMatrix::from_element(1, 1, var))
    }

    /// A degenerate (zero-covariance) distribution concentrated at `mean`.
    /// Raw observation vectors are coerced through this.
    pub fn dirac(mean: DVector<f64>) -> Self {
        let dim = mean.nrows();
        Self {
            mean,
            cov: DMatrix::zeros(dim, dim),
        }
    }

    /// Reinterprets an arbitrary distribution as a Gaussian by matching its
    /// first two moments. Used by the filter when approximate propagation is
    /// enabled.
    pub fn approximate(distr: &dyn Distr) -> Self {
        Self::new(distr.mean().clone_owned(), distr.cov().clone_owned())
    }

    pub fn dim(&self) -> usize {
        self.mean.nrows()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// The distribution of `A·x + b` for `x` distributed as `self`.
    pub fn affine(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Self {
        Self::new(a * &self.mean + b, a * &self.cov * a.transpose())
    }

    /// The distribution of the sum of two independent Gaussian variables.
    pub fn sum(&self, other: &Self) -> Self {
        Self::new(&self.mean + &other.mean, &self.cov + &other.cov)
    }
}

impl Distr for GaussianDistr {
    fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    fn as_gaussian(&self) -> Option<&GaussianDistr> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn scalar_and_dirac_shapes() {
        let g = GaussianDistr::scalar(1.5, 0.25);
        assert_eq!(g.dim(), 1);
        assert_abs_diff_eq!(g.mean()[0], 1.5);
        assert_abs_diff_eq!(g.cov()[(0, 0)], 0.25);

        let d = GaussianDistr::dirac(dvector![2.0, 3.0]);
        assert_eq!(d.dim(), 2);
        assert_abs_diff_eq!(d.cov().norm(), 0.0);
    }

    #[test]
    #[should_panic(expected = "mean/covariance row mismatch")]
    fn rejects_mismatched_shapes() {
        GaussianDistr::new(dvector![0.0, 0.0], DMatrix::zeros(3, 3));
    }

    #[test]
    fn affine_maps_moments() {
        let g = GaussianDistr::new(dvector![1.0, -1.0], dmatrix![2.0, 0.5; 0.5, 1.0]);
        let a = dmatrix![1.0, 1.0];
        let mapped = g.affine(&a, &dvector![3.0]);
        assert_abs_diff_eq!(mapped.mean()[0], 3.0);
        // a Σ aᵀ = 2 + 0.5 + 0.5 + 1
        assert_abs_diff_eq!(mapped.cov()[(0, 0)], 4.0);
    }

    #[test]
    fn sum_of_independents_adds_moments() {
        let a = GaussianDistr::scalar(1.0, 2.0);
        let b = GaussianDistr::scalar(-0.5, 3.0);
        let s = a.sum(&b);
        assert_abs_diff_eq!(s.mean()[0], 0.5);
        assert_abs_diff_eq!(s.cov()[(0, 0)], 5.0);
    }

    #[test]
    fn approximate_copies_first_two_moments() {
        let g = GaussianDistr::scalar(4.0, 9.0);
        let approx = GaussianDistr::approximate(&g);
        assert_eq!(&approx, &g);
    }
}
