//! Target topology and calibration data.
//!
//! A [`Topology`] bundles the structural properties a compilation target
//! needs ([`CouplingMap`], [`BasisGates`]) with an optional [`Calibration`]
//! snapshot used by the fidelity-aware router and by [`compute_metrics`](crate::metrics::compute_metrics).
//! Calibration is explicitly optional: routers and metrics fall back to
//! documented defaults when a given qubit or gate has no measured data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::property::{BasisGates, CouplingMap};

/// Default single- or two-qubit gate error used when calibration omits an entry.
pub const DEFAULT_GATE_ERROR: f64 = 0.001;

/// Default gate duration (seconds) used when calibration omits an entry.
pub const DEFAULT_GATE_DURATION: f64 = 0.0;

/// A typical upper-bound T2 (200 microseconds, in seconds) used to normalise
/// [`Calibration::qubit_quality`]'s coherence score into roughly `[0, 1]`.
const TYPICAL_T2_SECONDS: f64 = 200e-6;

/// Per-qubit calibration data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QubitCalibration {
    /// Physical qubit index.
    pub index: u32,
    /// T1 relaxation time (seconds). `None`/non-positive disables decoherence scoring.
    pub t1: Option<f64>,
    /// T2 dephasing time (seconds).
    pub t2: Option<f64>,
    /// Single-shot readout error probability.
    pub readout_error: Option<f64>,
}

impl QubitCalibration {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            t1: None,
            t2: None,
            readout_error: None,
        }
    }
}

/// Per-(gate, qubits) calibration data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCalibration {
    /// Gate name, e.g. `"cx"`, `"rz"`.
    pub name: String,
    /// The physical qubits the calibration entry applies to, in canonical
    /// (sorted) order so lookups don't depend on operand order.
    pub qubits: Vec<u32>,
    /// Measured gate error (infidelity).
    pub gate_error: Option<f64>,
    /// Measured gate duration (seconds).
    pub duration: Option<f64>,
}

/// A calibration snapshot for a physical device.
///
/// Lookup maps are built once via [`Calibration::build_index`] (or automatically
/// the first time a getter is used via the precomputed index below) rather
/// than linearly scanning `gates`/`qubits` per call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Calibration {
    pub qubits: Vec<QubitCalibration>,
    pub gates: Vec<GateCalibration>,
    #[serde(skip)]
    qubit_index: FxHashMap<u32, usize>,
    #[serde(skip)]
    gate_index: FxHashMap<(String, Vec<u32>), usize>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)build the lookup indices. Must be called after deserialization
    /// or after mutating `qubits`/`gates` directly.
    pub fn build_index(&mut self) {
        self.qubit_index = self
            .qubits
            .iter()
            .enumerate()
            .map(|(i, q)| (q.index, i))
            .collect();
        self.gate_index = self
            .gates
            .iter()
            .enumerate()
            .map(|(i, g)| {
                let mut qubits = g.qubits.clone();
                qubits.sort_unstable();
                ((g.name.clone(), qubits), i)
            })
            .collect();
    }

    pub fn qubit(&self, physical: u32) -> Option<&QubitCalibration> {
        self.qubit_index
            .get(&physical)
            .map(|&i| &self.qubits[i])
    }

    /// Look up a gate calibration entry by name and physical qubits (any order).
    pub fn gate(&self, name: &str, qubits: &[u32]) -> Option<&GateCalibration> {
        let mut key = qubits.to_vec();
        key.sort_unstable();
        self.gate_index
            .get(&(name.to_string(), key))
            .map(|&i| &self.gates[i])
    }

    /// Gate error for `name` on `qubits`, falling back to [`DEFAULT_GATE_ERROR`].
    pub fn gate_error(&self, name: &str, qubits: &[u32]) -> f64 {
        self.gate(name, qubits)
            .and_then(|g| g.gate_error)
            .unwrap_or(DEFAULT_GATE_ERROR)
    }

    /// Gate duration for `name` on `qubits`, falling back to [`DEFAULT_GATE_DURATION`].
    pub fn gate_duration(&self, name: &str, qubits: &[u32]) -> f64 {
        self.gate(name, qubits)
            .and_then(|g| g.duration)
            .unwrap_or(DEFAULT_GATE_DURATION)
    }

    /// Readout error for a physical qubit, if calibrated.
    pub fn readout_error(&self, physical: u32) -> Option<f64> {
        self.qubit(physical).and_then(|q| q.readout_error)
    }

    /// T1 for a physical qubit, if calibrated and positive.
    pub fn t1(&self, physical: u32) -> Option<f64> {
        self.qubit(physical).and_then(|q| q.t1).filter(|t| *t > 0.0)
    }

    /// T2 for a physical qubit, if calibrated and positive.
    pub fn t2(&self, physical: u32) -> Option<f64> {
        self.qubit(physical).and_then(|q| q.t2).filter(|t| *t > 0.0)
    }

    /// Quality score in `[0, 1]` used by the calibration-aware router's
    /// initial-embedding search: a weighted blend of readout fidelity and a
    /// clipped T2 score. Missing data scores neutrally at `0.5`.
    pub fn qubit_quality(&self, physical: u32, readout_weight: f64, coherence_weight: f64) -> f64 {
        let readout_score = self
            .readout_error(physical)
            .map_or(0.5, |r| 1.0 / (1.0 + r));
        let coherence_score = self
            .t2(physical)
            .map_or(0.5, |t2| (t2 / TYPICAL_T2_SECONDS).clamp(0.0, 1.0));
        readout_weight * readout_score + coherence_weight * coherence_score
    }
}

/// A compilation target: connectivity, native gates, and optional calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub id: Option<String>,
    pub name: String,
    pub num_qubits: u32,
    pub coupling_map: CouplingMap,
    pub basis_gates: BasisGates,
    pub calibration: Option<Calibration>,
}

impl Topology {
    pub fn new(name: impl Into<String>, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        let num_qubits = coupling_map.num_qubits();
        Self {
            id: None,
            name: name.into(),
            num_qubits,
            coupling_map,
            basis_gates,
            calibration: None,
        }
    }

    #[must_use]
    pub fn with_calibration(mut self, mut calibration: Calibration) -> Self {
        calibration.build_index();
        self.calibration = Some(calibration);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restore transient caches after deserializing a `Topology` from JSON/YAML.
    pub fn rebuild_caches(&mut self) {
        self.coupling_map.rebuild_caches();
        if let Some(cal) = self.calibration.as_mut() {
            cal.build_index();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_error_defaults_when_uncalibrated() {
        let cal = Calibration::new();
        assert_eq!(cal.gate_error("cx", &[0, 1]), DEFAULT_GATE_ERROR);
        assert_eq!(cal.gate_duration("cx", &[0, 1]), DEFAULT_GATE_DURATION);
    }

    #[test]
    fn gate_lookup_is_order_independent() {
        let mut cal = Calibration {
            qubits: vec![],
            gates: vec![GateCalibration {
                name: "cx".into(),
                qubits: vec![1, 0],
                gate_error: Some(0.02),
                duration: Some(300e-9),
            }],
            qubit_index: FxHashMap::default(),
            gate_index: FxHashMap::default(),
        };
        cal.build_index();
        assert_eq!(cal.gate_error("cx", &[0, 1]), 0.02);
        assert_eq!(cal.gate_duration("cx", &[1, 0]), 300e-9);
    }

    #[test]
    fn qubit_quality_neutral_without_data() {
        let cal = Calibration::new();
        assert!((cal.qubit_quality(0, 0.5, 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn topology_builder_attaches_calibration() {
        let topo = Topology::new("test", CouplingMap::linear(3), BasisGates::new(["rz", "sx", "cx"]))
            .with_calibration(Calibration::new());
        assert_eq!(topo.num_qubits, 3);
        assert!(topo.calibration.is_some());
    }
}
