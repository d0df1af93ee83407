//! Qforge Compilation and Transpilation Framework
//!
//! This crate provides the transpilation pipeline that turns a logical
//! circuit into one a specific device topology can execute: gate
//! normalisation, basis mapping, qubit routing, and fidelity estimation,
//! orchestrated by a pass-based architecture similar to LLVM.
//!
//! # Overview
//!
//! The pipeline transforms an input circuit through a fixed sequence of
//! stages:
//! 1. **Normalisation**: rewrite every gate into the canonical set `{rx, ry,
//!    rz, h, s, t, x, y, z, cx, cz}`.
//! 2. **Basis mapping**: decompose into the target's native gate set
//!    (`{rz, sx, x, id, cz, cx, rx, ry, h, s, t, swap}`).
//! 3. **Routing**: map logical qubits onto physical ones and insert SWAPs
//!    to satisfy the coupling map, via one of four interchangeable
//!    [`Algorithm`] strategies.
//! 4. **Metrics**: estimate gate, readout, and decoherence fidelity from
//!    calibration data.
//!
//! # Architecture
//!
//! ```text
//! Input Circuit
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (coupling map, basis gates, layout)
//! └─────────────┘
//!       │
//!       ├── GateNormalization
//!       ├── BasisMapping
//!       ├── NaiveRouting / DynamicRouting / SabreRouting / CalibrationAwareRouting
//!       └── MeasurementBarrierVerification
//!       │
//!       ▼
//! Output Circuit (hardware-compatible) + CircuitMetrics
//! ```
//!
//! # Example: Basic Compilation
//!
//! ```rust
//! use qforge_compile::{PassManagerBuilder, CouplingMap, BasisGates};
//! use qforge_ir::Circuit;
//!
//! // Create a circuit
//! let circuit = Circuit::bell().unwrap();
//!
//! // Build pass manager for a target with RZ+SX+CX native gates
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_target(CouplingMap::linear(5), BasisGates::new(["rz", "sx", "x", "cx", "id"]))
//!     .build();
//!
//! // Compile the circuit
//! let mut dag = circuit.into_dag();
//! pm.run(&mut dag, &mut props).unwrap();
//!
//! let compiled = Circuit::from_dag(dag);
//! println!("Compiled depth: {}", compiled.depth());
//! ```
//!
//! # Built-in Passes
//!
//! ## Agnostic Passes
//! - [`passes::GateNormalization`]: rewrite into the canonical gate set
//! - [`passes::MeasurementBarrierVerification`]: check post-routing wire ordering
//!
//! ## Target Passes
//! - [`passes::TrivialLayout`]: initial 1:1 mapping of virtual to physical qubits
//! - [`passes::BasisMapping`]: decompose into the target's native gate set
//! - [`passes::NaiveRouting`] / [`passes::DynamicRouting`] / [`passes::SabreRouting`] /
//!   [`passes::CalibrationAwareRouting`]: the four routing strategies
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use qforge_compile::{Pass, PassKind, CompileResult, PropertySet};
//! use qforge_ir::CircuitDag;
//!
//! struct MyCustomPass;
//!
//! impl Pass for MyCustomPass {
//!     fn name(&self) -> &str { "my_custom_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut CircuitDag, props: &mut PropertySet) -> CompileResult<()> {
//!         // Your pass logic here
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod manager;
pub mod metrics;
pub mod pass;
pub mod property;
pub mod topology;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use manager::{transpile, Algorithm, PassManager, PassManagerBuilder, TranspileResult};
pub use metrics::{compute_metrics, CircuitMetrics, PerQubitMetrics};
pub use pass::{AnalysisPass, Pass, PassKind, TransformationPass};
pub use passes::agnostic::{GateNormalization, MeasurementBarrierVerification};
pub use passes::target::{
    BasisMapping, CalibrationAwareRouting, DynamicRouting, NaiveRouting, SabreRouting,
};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet};
pub use topology::{Calibration, GateCalibration, QubitCalibration, Topology};
