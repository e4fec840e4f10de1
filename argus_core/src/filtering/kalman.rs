// argus_core/src/filtering/kalman.rs

use crate::distr::{Distr, GaussianDistr};
use crate::error::FilterError;
use crate::filtering::{
    EmitOptions, FilterEvent, FilterSink, FilterState, Obs, ObsResult, PredictedObs, TrueValue,
};
use crate::linalg::{block_diag, vstack};
use crate::processes::MarkovProcess;
use crate::types::{FilterHandle, Time};
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

// --- OBSERVATION MODEL TRAIT ---
// Maps a (sub-)state distribution into a predicted observation. `z = h(x) + v`
pub trait ObsModel: Debug + DynClone + Send + Sync {
    /// Predicts the observation distribution and the cross-covariance between
    /// the given state and the observation (observation × state orientation).
    ///
    /// Must be a pure function of its inputs.
    fn predict_obs(&self, time: Time, state_distr: &GaussianDistr) -> PredictedObs;
}

// Generates `Clone` for `Box<dyn ObsModel>`.
dyn_clone::clone_trait_object!(ObsModel);

/// The linear-Gaussian observation model: a fixed observation matrix `H`
/// applied to the state, so that the predicted observation is
/// `N(H·m, H·Σ·Hᵀ)` with cross-covariance `H·Σ`.
#[derive(Debug, Clone)]
pub struct LinearGaussianObsModel {
    obs_matrix: DMatrix<f64>,
}

impl LinearGaussianObsModel {
    pub fn new(obs_matrix: DMatrix<f64>) -> Self {
        Self { obs_matrix }
    }

    /// A 1×1 observation matrix from a bare coefficient.
    pub fn scalar(h: f64) -> Self {
        Self::new(DMatrix::from_element(1, 1, h))
    }

    /// Combines per-process observation matrices block-diagonally, so each
    /// contributes to disjoint rows of the observation vector.
    pub fn compose(obs_matrices: &[DMatrix<f64>]) -> Self {
        Self::new(block_diag(obs_matrices))
    }

    /// The identity model: the observation is the state itself.
    pub fn identity(dim: usize) -> Self {
        Self::new(DMatrix::identity(dim, dim))
    }

    pub fn obs_matrix(&self) -> &DMatrix<f64> {
        &self.obs_matrix
    }
}

impl ObsModel for LinearGaussianObsModel {
    fn predict_obs(&self, time: Time, state_distr: &GaussianDistr) -> PredictedObs {
        let obs_mean = &self.obs_matrix * state_distr.mean();
        let cross_cov = &self.obs_matrix * state_distr.cov();
        let obs_cov = &cross_cov * self.obs_matrix.transpose();
        PredictedObs {
            time,
            distr: GaussianDistr::new(obs_mean, obs_cov),
            cross_cov,
        }
    }
}

// --- OBSERVABLE ---

/// A view of a filter restricted to a subset of its processes, plus the
/// observation model that watches that subset.
///
/// An observable is created by [`KalmanFilter::create_observable`] and is
/// immutable for the filter's lifetime. It does not own the filter; each call
/// takes the filter explicitly and rejects any other instance.
#[derive(Debug, Clone)]
pub struct Observable {
    filter: FilterHandle,
    obs_model: Box<dyn ObsModel>,
    /// Row ranges of the observed processes within the joint state, in the
    /// order the processes were matched.
    mean_ranges: Vec<Range<usize>>,
    sub_dim: usize,
}

impl Observable {
    fn check_filter(&self, filter: &KalmanFilter) -> Result<(), FilterError> {
        if self.filter != filter.handle {
            return Err(FilterError::FilterMismatch);
        }
        Ok(())
    }

    fn sub_state_mean(&self, state_mean: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.sub_dim);
        let mut row = 0;
        for r in &self.mean_ranges {
            out.rows_mut(row, r.len())
                .copy_from(&state_mean.rows(r.start, r.len()));
            row += r.len();
        }
        out
    }

    // The Cartesian product of the observed row ranges: off-diagonal
    // rectangles carry whatever cross-correlation the observed processes have
    // accumulated, so they must come along too.
    fn sub_state_cov(&self, state_cov: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.sub_dim, self.sub_dim);
        let mut row = 0;
        for ri in &self.mean_ranges {
            let mut col = 0;
            for rj in &self.mean_ranges {
                out.view_mut((row, col), (ri.len(), rj.len()))
                    .copy_from(&state_cov.view((ri.start, rj.start), (ri.len(), rj.len())));
                col += rj.len();
            }
            row += ri.len();
        }
        out
    }

    fn sub_state_distr(&self, state_distr: &GaussianDistr) -> GaussianDistr {
        GaussianDistr::new(
            self.sub_state_mean(state_distr.mean()),
            self.sub_state_cov(state_distr.cov()),
        )
    }

    /// Advances the filter to `time` and predicts the observation from this
    /// observable's sub-state view.
    ///
    /// The observation model returns the cross-covariance between the
    /// *observed* sub-state and the observation; downstream Kalman algebra
    /// runs in full joint-state coordinates, so the sub-state columns are
    /// scattered back into their joint positions and every other column is
    /// zero-filled.
    pub fn predict(
        &self,
        filter: &mut KalmanFilter,
        time: Time,
        true_value: Option<&DVector<f64>>,
    ) -> Result<PredictedObs, FilterError> {
        self.check_filter(filter)?;
        filter.predict(time, true_value)?;
        let sub_distr = self.sub_state_distr(&filter.state_distr);
        let predicted = self.obs_model.predict_obs(time, &sub_distr);

        let obs_dim = predicted.cross_cov.nrows();
        let mut cross_cov = DMatrix::zeros(obs_dim, filter.state_distr.dim());
        let mut col = 0;
        for r in &self.mean_ranges {
            cross_cov
                .view_mut((0, r.start), (obs_dim, r.len()))
                .copy_from(&predicted.cross_cov.view((0, col), (obs_dim, r.len())));
            col += r.len();
        }

        Ok(PredictedObs {
            time,
            distr: predicted.distr,
            cross_cov,
        })
    }

    /// Feeds one observation through the filter.
    ///
    /// The observation time is the explicit `time` argument if given, else
    /// the observation's own time, else the filter's current time. A raw
    /// vector observation is treated as noiseless. When `predicted_obs` is
    /// not supplied it is computed by [`Observable::predict`] first.
    pub fn observe(
        &self,
        filter: &mut KalmanFilter,
        obs: impl Into<Obs>,
        time: Option<Time>,
        true_value: Option<&DVector<f64>>,
        predicted_obs: Option<PredictedObs>,
    ) -> Result<ObsResult, FilterError> {
        self.check_filter(filter)?;
        let obs: Obs = obs.into();
        let time = obs.resolve_time(time, filter.time);
        let predicted_obs = match predicted_obs {
            Some(p) => p,
            None => self.predict(filter, time, true_value)?,
        };
        filter.observe(obs.distr, predicted_obs, true_value)
    }
}

// --- KALMAN FILTER ---

/// A Kalman filter over the joint state of one or more composed Markov
/// processes.
///
/// The joint state stacks the component states in process order; its
/// covariance is block-diagonal right after construction and after every
/// `predict` (independent per-process propagation), and picks up
/// cross-process terms only through observations that span processes.
pub struct KalmanFilter {
    handle: FilterHandle,
    time: Time,
    state_distr: GaussianDistr,
    is_posterior: bool,
    processes: Vec<Arc<dyn MarkovProcess>>,
    approximate_distr: bool,
    sink: Option<Box<dyn FilterSink>>,
    emit: EmitOptions,
}

impl Debug for KalmanFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalmanFilter")
            .field("handle", &self.handle)
            .field("time", &self.time)
            .field("state_distr", &self.state_distr)
            .field("is_posterior", &self.is_posterior)
            .field("approximate_distr", &self.approximate_distr)
            .finish_non_exhaustive()
    }
}

impl KalmanFilter {
    /// Creates a filter with no notification sink.
    ///
    /// # Panics
    /// Panics if the process dimensions do not sum to the prior's dimension,
    /// or if `processes` is empty.
    pub fn new(
        time: Time,
        state_distr: GaussianDistr,
        processes: Vec<Arc<dyn MarkovProcess>>,
        approximate_distr: bool,
    ) -> Self {
        Self::build(time, state_distr, processes, approximate_distr, None, EmitOptions::none())
    }

    /// Creates a filter that publishes the selected event kinds to `sink`.
    /// If the prior-state kind is enabled, the initial state is emitted here.
    pub fn with_sink(
        time: Time,
        state_distr: GaussianDistr,
        processes: Vec<Arc<dyn MarkovProcess>>,
        approximate_distr: bool,
        sink: Box<dyn FilterSink>,
        emit: EmitOptions,
    ) -> Self {
        Self::build(time, state_distr, processes, approximate_distr, Some(sink), emit)
    }

    fn build(
        time: Time,
        state_distr: GaussianDistr,
        processes: Vec<Arc<dyn MarkovProcess>>,
        approximate_distr: bool,
        sink: Option<Box<dyn FilterSink>>,
        emit: EmitOptions,
    ) -> Self {
        assert!(!processes.is_empty(), "a filter needs at least one process");
        let total_dim: usize = processes.iter().map(|p| p.process_dim()).sum();
        assert_eq!(
            total_dim,
            state_distr.dim(),
            "process dimensions must sum to the prior state dimension"
        );
        let mut filter = Self {
            handle: FilterHandle::next(),
            time,
            state_distr,
            is_posterior: false,
            processes,
            approximate_distr,
            sink,
            emit,
        };
        if filter.emit.prior_state {
            let state = filter.state();
            filter.send(FilterEvent::PriorState(state));
        }
        filter
    }

    pub fn handle(&self) -> FilterHandle {
        self.handle
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn is_posterior(&self) -> bool {
        self.is_posterior
    }

    pub fn state_distr(&self) -> &GaussianDistr {
        &self.state_distr
    }

    /// A snapshot of the current belief.
    pub fn state(&self) -> FilterState {
        FilterState {
            time: self.time,
            is_posterior: self.is_posterior,
            state_distr: self.state_distr.clone(),
        }
    }

    /// Restores a previously captured snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot's dimension does not match this filter's
    /// process composition.
    pub fn set_state(&mut self, state: FilterState) {
        let total_dim: usize = self.processes.iter().map(|p| p.process_dim()).sum();
        assert_eq!(total_dim, state.state_distr.dim(), "snapshot dimension mismatch");
        self.time = state.time;
        self.is_posterior = state.is_posterior;
        self.state_distr = state.state_distr;
    }

    /// Creates an observable over `observed` with the given observation
    /// model. Each observed process must be one of this filter's processes
    /// (same `Arc`, matched by identity).
    pub fn create_observable(
        &self,
        obs_model: Box<dyn ObsModel>,
        observed: &[Arc<dyn MarkovProcess>],
    ) -> Result<Observable, FilterError> {
        self.bind_observable(Some(obs_model), observed)
    }

    /// Creates an observable whose model is the identity over the combined
    /// dimension of the observed processes.
    pub fn create_identity_observable(
        &self,
        observed: &[Arc<dyn MarkovProcess>],
    ) -> Result<Observable, FilterError> {
        self.bind_observable(None, observed)
    }

    fn bind_observable(
        &self,
        obs_model: Option<Box<dyn ObsModel>>,
        observed: &[Arc<dyn MarkovProcess>],
    ) -> Result<Observable, FilterError> {
        let mut mean_ranges = Vec::new();
        for op in observed {
            let mut matched = false;
            let mut row = 0;
            for ap in &self.processes {
                let dim = ap.process_dim();
                if Arc::ptr_eq(op, ap) {
                    matched = true;
                    mean_ranges.push(row..row + dim);
                }
                row += dim;
            }
            if !matched {
                return Err(FilterError::UnmatchedProcess);
            }
        }
        let sub_dim = mean_ranges.iter().map(|r| r.len()).sum();
        let obs_model =
            obs_model.unwrap_or_else(|| Box::new(LinearGaussianObsModel::identity(sub_dim)));
        Ok(Observable {
            filter: self.handle,
            obs_model,
            mean_ranges,
            sub_dim,
        })
    }

    /// Advances the joint state distribution to `time`.
    ///
    /// Time is monotonic: a `time` before the current one is an error, an
    /// equal one is a no-op. Each process is propagated independently on its
    /// own mean rows and diagonal covariance block, and the joint
    /// distribution is reassembled block-diagonally. The new state is
    /// committed only once every process has propagated, so a failure leaves
    /// the filter exactly as it was.
    pub fn predict(
        &mut self,
        time: Time,
        true_value: Option<&DVector<f64>>,
    ) -> Result<(), FilterError> {
        if time < self.time {
            return Err(FilterError::InvalidTime {
                current: self.time,
                requested: time,
            });
        }
        if self.emit.true_value {
            if let Some(value) = true_value {
                self.send(FilterEvent::TrueValue(TrueValue {
                    time: self.time,
                    value: value.clone_owned(),
                }));
            }
        }
        if time == self.time {
            return Ok(());
        }

        let mut propagated = Vec::with_capacity(self.processes.len());
        let mut row = 0;
        for process in &self.processes {
            let dim = process.process_dim();
            let sub_distr = GaussianDistr::new(
                self.state_distr.mean().rows(row, dim).into_owned(),
                self.state_distr.cov().view((row, row), (dim, dim)).into_owned(),
            );
            let next = process.propagate_distr(self.time, &sub_distr, time, self.approximate_distr);
            let next = match next.as_gaussian() {
                Some(gaussian) => gaussian.clone(),
                None if self.approximate_distr => GaussianDistr::approximate(next.as_ref()),
                None => return Err(FilterError::NonGaussianPropagation),
            };
            propagated.push(next);
            row += dim;
        }

        let means: Vec<_> = propagated.iter().map(|d| d.mean().clone_owned()).collect();
        let covs: Vec<_> = propagated.iter().map(|d| d.cov().clone_owned()).collect();
        self.state_distr = GaussianDistr::new(vstack(&means), block_diag(&covs));
        self.is_posterior = false;
        self.time = time;
        if self.emit.prior_state {
            let state = self.state();
            self.send(FilterEvent::PriorState(state));
        }
        Ok(())
    }

    /// Conditions the joint state on one observation.
    ///
    /// `predicted_obs` must carry the cross-covariance in observation ×
    /// joint-state orientation, as produced by [`Observable::predict`]. The
    /// posterior replaces the joint state wholesale and the returned result
    /// carries the innovation distribution, the exact Gaussian
    /// log-likelihood of the innovation, and the gain that was applied.
    pub fn observe(
        &mut self,
        obs_distr: GaussianDistr,
        predicted_obs: PredictedObs,
        true_value: Option<&DVector<f64>>,
    ) -> Result<ObsResult, FilterError> {
        assert_eq!(
            obs_distr.dim(),
            predicted_obs.distr.dim(),
            "observation/predicted observation dimension mismatch"
        );
        if self.emit.true_value {
            if let Some(value) = true_value {
                self.send(FilterEvent::TrueValue(TrueValue {
                    time: self.time,
                    value: value.clone_owned(),
                }));
            }
        }

        let innov = obs_distr.mean() - predicted_obs.distr.mean();
        let innov_cov = predicted_obs.distr.cov() + obs_distr.cov();
        let innov_cov_inv = innov_cov
            .clone()
            .try_inverse()
            .ok_or(FilterError::SingularInnovationCov)?;
        let gain = predicted_obs.cross_cov.transpose() * &innov_cov_inv;

        let mean = self.state_distr.mean() + &gain * &innov;
        let cov = self.state_distr.cov() - &gain * &predicted_obs.cross_cov;
        self.state_distr = GaussianDistr::new(mean, cov);
        self.is_posterior = true;
        if self.emit.posterior_state {
            let state = self.state();
            self.send(FilterEvent::PosteriorState(state));
        }

        let ln_2pi = (2.0 * std::f64::consts::PI).ln();
        let quad_form = (innov.transpose() * &innov_cov_inv * &innov)[(0, 0)];
        let log_likelihood =
            -0.5 * (obs_distr.dim() as f64 * ln_2pi + innov_cov.determinant().ln() + quad_form);

        let result = ObsResult {
            accepted: true,
            obs: Obs::at(self.time, obs_distr),
            predicted_obs,
            innov_distr: GaussianDistr::new(innov, innov_cov),
            log_likelihood,
            gain,
        };
        if self.emit.obs_result {
            self.send(FilterEvent::ObsResult(result.clone()));
        }
        Ok(result)
    }

    fn send(&mut self, event: FilterEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.send(event);
        }
    }
}
