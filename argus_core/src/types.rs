// argus_core/src/types.rs

use nalgebra::{DMatrix, DVector};
use std::sync::atomic::{AtomicU64, Ordering};

// --- Core Type Aliases ---
pub type Time = f64;
pub type StateVec = DVector<f64>;
pub type CovMat = DMatrix<f64>;

// --- Core Identifier ---
/// A unique, hashable identifier for one filter instance.
///
/// Observables created by a filter carry its handle, so an observable handed
/// a different filter can be rejected instead of silently mixing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub u64);

impl FilterHandle {
    /// Allocates a fresh handle. Handles are unique per process lifetime.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}
