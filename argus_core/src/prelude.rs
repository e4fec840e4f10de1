// argus_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::distr::Distr;
pub use crate::filtering::kalman::ObsModel;
pub use crate::filtering::FilterSink;
pub use crate::processes::MarkovProcess;
pub use crate::types::{FilterHandle, Time};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::distr::GaussianDistr;
pub use crate::error::FilterError;
pub use crate::filtering::{
    EmitOptions, FilterEvent, FilterState, Obs, ObsResult, PredictedObs, TrueValue,
};

// --- Filtering Algorithms ---
pub use crate::filtering::kalman::{KalmanFilter, Observable};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::filtering::kalman::LinearGaussianObsModel;
pub use crate::processes::WienerProcess;
