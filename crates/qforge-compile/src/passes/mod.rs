//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: Target-agnostic passes that operate purely on DAG structure
//! - [`target`]: Target-specific passes that require hardware properties

pub mod agnostic;
pub mod target;

pub use agnostic::{GateNormalization, MeasurementBarrierVerification, VerificationResult};
pub use target::{
    BasisMapping, CalibrationAwareRouting, DynamicRouting, NaiveRouting, RouterStats,
    SabreRouting, TrivialLayout,
};
