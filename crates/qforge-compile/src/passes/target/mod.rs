//! Target-specific passes: layout, basis mapping, and routing.
//!
//! These passes require hardware properties (a coupling map, a native
//! gate set, and optionally calibration data) to do their work, unlike
//! [`crate::passes::agnostic`] passes which operate purely on DAG structure.

pub mod basis_mapping;
pub mod calibration_aware_routing;
pub mod dependency;
pub mod dynamic_routing;
pub mod layout;
pub mod naive_routing;
pub mod router_support;
pub mod sabre_routing;

pub use basis_mapping::BasisMapping;
pub use calibration_aware_routing::CalibrationAwareRouting;
pub use dynamic_routing::DynamicRouting;
pub use layout::TrivialLayout;
pub use naive_routing::NaiveRouting;
pub use router_support::RouterStats;
pub use sabre_routing::SabreRouting;
