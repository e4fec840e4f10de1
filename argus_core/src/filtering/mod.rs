// argus_core/src/filtering/mod.rs

use crate::distr::GaussianDistr;
use crate::types::Time;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub mod kalman;

/// A point-in-time snapshot of a filter's belief. Emitted after every
/// predict (prior) and observe (posterior) step; never mutated afterwards.
///
/// Snapshots serialize, so a caller can persist one and restore it later via
/// [`kalman::KalmanFilter::set_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub time: Time,
    pub is_posterior: bool,
    pub state_distr: GaussianDistr,
}

/// A realized ground-truth value, forwarded to the sink for diagnostics and
/// backtesting when the caller knows the true state.
#[derive(Debug, Clone)]
pub struct TrueValue {
    pub time: Time,
    pub value: DVector<f64>,
}

/// An observation handed to the filter: an observation-space distribution
/// plus, optionally, the time it was taken at.
#[derive(Debug, Clone)]
pub struct Obs {
    pub time: Option<Time>,
    pub distr: GaussianDistr,
}

impl Obs {
    pub fn at(time: Time, distr: GaussianDistr) -> Self {
        Self {
            time: Some(time),
            distr,
        }
    }

    /// Resolution order: an explicit time argument wins, then the
    /// observation's own time, then the filter's current time.
    pub(crate) fn resolve_time(&self, explicit: Option<Time>, filter_time: Time) -> Time {
        explicit.or(self.time).unwrap_or(filter_time)
    }
}

// A raw vector observation is a noiseless (Dirac) measurement.
impl From<DVector<f64>> for Obs {
    fn from(value: DVector<f64>) -> Self {
        Self {
            time: None,
            distr: GaussianDistr::dirac(value),
        }
    }
}

impl From<GaussianDistr> for Obs {
    fn from(distr: GaussianDistr) -> Self {
        Self { time: None, distr }
    }
}

/// An observation-model output: the predicted observation distribution plus
/// the cross-covariance between the state and the observation.
///
/// An observation model produces `cross_cov` in observation × sub-state
/// orientation; [`kalman::Observable::predict`] re-embeds it to
/// observation × joint-state before it reaches the filter.
#[derive(Debug, Clone)]
pub struct PredictedObs {
    pub time: Time,
    pub distr: GaussianDistr,
    pub cross_cov: DMatrix<f64>,
}

/// Everything `observe` produced in one step: the realized and predicted
/// observations, the innovation distribution N(ν, S), the exact Gaussian
/// log-likelihood of the innovation, and the Kalman gain that was applied.
#[derive(Debug, Clone)]
pub struct ObsResult {
    pub accepted: bool,
    pub obs: Obs,
    pub predicted_obs: PredictedObs,
    pub innov_distr: GaussianDistr,
    pub log_likelihood: f64,
    pub gain: DMatrix<f64>,
}

// --- NOTIFICATION SINK ---

/// The event kinds a filter can publish.
#[derive(Debug, Clone)]
pub enum FilterEvent {
    PriorState(FilterState),
    PosteriorState(FilterState),
    TrueValue(TrueValue),
    ObsResult(ObsResult),
}

/// The publish side of the notification mechanism. The filter never reads
/// anything back; a sink that drops every event is a valid implementation.
pub trait FilterSink: Send {
    fn send(&mut self, event: FilterEvent);
}

/// Selects which event kinds a configured sink receives. With no sink
/// configured the whole mechanism is inert regardless of these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub prior_state: bool,
    pub posterior_state: bool,
    pub true_value: bool,
    pub obs_result: bool,
}

impl EmitOptions {
    pub const fn all() -> Self {
        Self {
            prior_state: true,
            posterior_state: true,
            true_value: true,
            obs_result: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            prior_state: false,
            posterior_state: false,
            true_value: false,
            obs_result: false,
        }
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self::all()
    }
}
