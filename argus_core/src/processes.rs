// argus_core/src/processes.rs

use crate::distr::{Distr, GaussianDistr};
use crate::types::Time;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

// --- MARKOV PROCESS TRAIT ---
// The dynamics side of the filter. A process owns a fixed-size block of the
// joint state and knows how to push its marginal distribution through time.
pub trait MarkovProcess: Debug + Send + Sync {
    /// The number of state dimensions this process contributes.
    fn process_dim(&self) -> usize;

    /// Propagates the distribution of this process's state from `from_time`
    /// to `to_time`.
    ///
    /// `assume_distr` signals that the caller will moment-match whatever
    /// comes back; implementations that can only propagate approximately may
    /// use it to skip exactness checks of their own.
    fn propagate_distr(
        &self,
        from_time: Time,
        distr: &GaussianDistr,
        to_time: Time,
        assume_distr: bool,
    ) -> Box<dyn Distr>;
}

/// A Wiener process with constant drift: over an interval of length `dt` the
/// mean moves by `drift·dt` and the covariance grows by `noise_cov·dt`.
///
/// This is the one concrete process the crate ships; anything richer is
/// expected to come from the caller as its own `MarkovProcess` impl.
#[derive(Debug, Clone)]
pub struct WienerProcess {
    drift: DVector<f64>,
    noise_cov: DMatrix<f64>,
}

impl WienerProcess {
    /// # Panics
    /// Panics if `noise_cov` is not square with side `drift.len()`.
    pub fn new(drift: DVector<f64>, noise_cov: DMatrix<f64>) -> Self {
        assert_eq!(drift.nrows(), noise_cov.nrows(), "drift/noise row mismatch");
        assert_eq!(noise_cov.nrows(), noise_cov.ncols(), "noise covariance must be square");
        Self { drift, noise_cov }
    }

    /// A driftless scalar random walk with variance `var_per_unit_time`.
    pub fn random_walk(var_per_unit_time: f64) -> Self {
        Self::new(
            DVector::zeros(1),
            DMatrix::from_element(1, 1, var_per_unit_time),
        )
    }

    /// A standard `dim`-dimensional Wiener process (zero drift, identity
    /// noise covariance per unit time).
    pub fn standard(dim: usize) -> Self {
        Self::new(DVector::zeros(dim), DMatrix::identity(dim, dim))
    }
}

impl MarkovProcess for WienerProcess {
    fn process_dim(&self) -> usize {
        self.drift.nrows()
    }

    fn propagate_distr(
        &self,
        from_time: Time,
        distr: &GaussianDistr,
        to_time: Time,
        _assume_distr: bool,
    ) -> Box<dyn Distr> {
        let dt = to_time - from_time;
        Box::new(GaussianDistr::new(
            distr.mean() + &self.drift * dt,
            distr.cov() + &self.noise_cov * dt,
        ))
    }
}
