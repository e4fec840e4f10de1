// argus_core/src/lib.rs

// This file defines the public modules of the library.
pub mod distr;
pub mod error;
pub mod filtering;
pub mod linalg;
pub mod prelude;
pub mod processes;
pub mod types;
