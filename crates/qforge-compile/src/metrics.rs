//! Fidelity and structural metrics for a transpiled circuit.
//!
//! [`compute_metrics`] implements a closed-form error model: a product of
//! independent survival probabilities (gate, readout, decoherence) combined
//! into one overall fidelity, plus the structural numbers (depth, gate
//! counts) a caller needs to judge a transpilation, all computed against
//! [`crate::topology::Topology`] and [`crate::property::Layout`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qforge_ir::{CircuitDag, InstructionKind, QubitId};

use crate::property::Layout;
use crate::topology::Topology;

/// Per-physical-qubit breakdown of the fidelity model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerQubitMetrics {
    /// Physical qubit index.
    pub physical_qubit: u32,
    /// Sum of gate durations (seconds) for non-measure ops touching this qubit.
    pub t_exec: f64,
    /// exp(-t_exec / T1), or 1.0 if T1 is uncalibrated.
    pub t1_fidelity: f64,
    /// 1 - t1_fidelity.
    pub t1_error: f64,
    /// exp(-t_exec / T2), or 1.0 if T2 is uncalibrated.
    pub t2_fidelity: f64,
    /// 1 - t2_fidelity.
    pub t2_error: f64,
    /// t1_fidelity * t2_fidelity.
    pub decoherence_fidelity: f64,
    /// 1 - decoherence_fidelity.
    pub decoherence_error: f64,
    /// Readout error for this qubit, if calibrated.
    pub readout_error: Option<f64>,
}

/// Structural, error, and fidelity metrics for one transpilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitMetrics {
    /// Depth of the original (pre-transpilation) circuit.
    pub original_depth: usize,
    /// Depth of the transpiled circuit.
    pub transpiled_depth: usize,
    /// `transpiled_depth - original_depth`.
    pub depth_increase: usize,
    /// Total gate count in the transpiled circuit (excludes measure/barrier/reset).
    pub total_gates: usize,
    /// Logical SWAP count reported by the router (transpiled circuits contain
    /// no raw `swap` ops after decomposition, so this is not re-derived from
    /// the output — it is the router's own count).
    pub n_swap_gates: usize,

    /// Product of `(1 - gate_error)` over every non-measure op.
    pub gate_fidelity: f64,
    /// `1 - gate_fidelity`.
    pub overall_gate_error: f64,

    /// Product of `t1_fidelity * t2_fidelity` over every physical qubit used.
    pub decoherence_fidelity: f64,
    /// Mean of `decoherence_error` over every physical qubit used.
    pub avg_decoherence_error: f64,
    /// `max` over physical qubits of `t_exec`.
    pub overall_execution_time: f64,

    /// Product of `(1 - readout_error)` over calibrated physical qubits.
    pub readout_fidelity: f64,
    /// Sum of readout errors over calibrated physical qubits.
    pub total_readout_error: f64,
    /// Mean readout error over calibrated physical qubits.
    pub avg_readout_error: f64,

    /// `gate_fidelity * readout_fidelity * decoherence_fidelity`.
    pub fidelity: f64,
    /// `1 - fidelity`.
    pub effective_error: f64,

    /// Per-physical-qubit breakdown, keyed by physical index.
    pub per_qubit_metrics: FxHashMap<u32, PerQubitMetrics>,
}

/// Compute structural, error, and fidelity metrics for a transpilation.
///
/// `swap_count` is the logical SWAP count a router reports in its
/// [`crate::passes::target::RouterStats`] — it is not re-derived from
/// `transpiled`, since routed circuits no longer contain raw `swap` ops
/// once basis mapping has decomposed them into CX/CZ blocks.
pub fn compute_metrics(
    original: &CircuitDag,
    transpiled: &CircuitDag,
    embedding: &Layout,
    topology: &Topology,
    swap_count: usize,
) -> CircuitMetrics {
    let original_depth = original.depth();
    let transpiled_depth = transpiled.depth();

    let mut total_gates = 0usize;
    let mut gate_fidelity = 1.0f64;

    let mut t_exec: FxHashMap<u32, f64> = FxHashMap::default();

    for (_, inst) in transpiled.topological_ops() {
        if !matches!(inst.kind, InstructionKind::Gate(_)) {
            continue;
        }
        total_gates += 1;
        let physical: Vec<u32> = inst.qubits.iter().map(|q| q.0).collect();
        let cal = topology.calibration.as_ref();
        let err = cal.map_or(crate::topology::DEFAULT_GATE_ERROR, |c| {
            c.gate_error(inst.name(), &physical)
        });
        gate_fidelity *= 1.0 - err;

        let duration = cal.map_or(crate::topology::DEFAULT_GATE_DURATION, |c| {
            c.gate_duration(inst.name(), &physical)
        });
        for p in physical {
            *t_exec.entry(p).or_insert(0.0) += duration;
        }
    }
    let overall_gate_error = 1.0 - gate_fidelity;

    // For each physical qubit in the image of the embedding.
    let mut physical_qubits: Vec<u32> = embedding.iter().map(|(_, p)| p).collect();
    physical_qubits.sort_unstable();

    let mut per_qubit_metrics = FxHashMap::default();
    let mut decoherence_fidelity = 1.0f64;
    let mut decoherence_errors = Vec::with_capacity(physical_qubits.len());
    let mut overall_execution_time = 0.0f64;

    let mut readout_fidelity = 1.0f64;
    let mut total_readout_error = 0.0f64;
    let mut n_readout = 0usize;

    for &p in &physical_qubits {
        let exec_time = t_exec.get(&p).copied().unwrap_or(0.0);
        overall_execution_time = overall_execution_time.max(exec_time);

        let cal = topology.calibration.as_ref();
        let t1 = cal.and_then(|c| c.t1(p));
        let t2 = cal.and_then(|c| c.t2(p));

        let t1_fidelity = t1.map_or(1.0, |t1| (-exec_time / t1).exp());
        let t1_error = 1.0 - t1_fidelity;
        let t2_fidelity = t2.map_or(1.0, |t2| (-exec_time / t2).exp());
        let t2_error = 1.0 - t2_fidelity;

        let qubit_decoherence_fidelity = t1_fidelity * t2_fidelity;
        let qubit_decoherence_error = 1.0 - qubit_decoherence_fidelity;
        decoherence_fidelity *= qubit_decoherence_fidelity;
        decoherence_errors.push(qubit_decoherence_error);

        let readout_error = cal.and_then(|c| c.readout_error(p));
        if let Some(r) = readout_error {
            readout_fidelity *= 1.0 - r;
            total_readout_error += r;
            n_readout += 1;
        }

        per_qubit_metrics.insert(
            p,
            PerQubitMetrics {
                physical_qubit: p,
                t_exec: exec_time,
                t1_fidelity,
                t1_error,
                t2_fidelity,
                t2_error,
                decoherence_fidelity: qubit_decoherence_fidelity,
                decoherence_error: qubit_decoherence_error,
                readout_error,
            },
        );
    }

    let avg_decoherence_error = if decoherence_errors.is_empty() {
        0.0
    } else {
        decoherence_errors.iter().sum::<f64>() / decoherence_errors.len() as f64
    };
    let avg_readout_error = if n_readout == 0 {
        0.0
    } else {
        total_readout_error / n_readout as f64
    };

    let fidelity = gate_fidelity * readout_fidelity * decoherence_fidelity;

    CircuitMetrics {
        original_depth,
        transpiled_depth,
        depth_increase: transpiled_depth.saturating_sub(original_depth),
        total_gates,
        n_swap_gates: swap_count,
        gate_fidelity,
        overall_gate_error,
        decoherence_fidelity,
        avg_decoherence_error,
        overall_execution_time,
        readout_fidelity,
        total_readout_error,
        avg_readout_error,
        fidelity,
        effective_error: 1.0 - fidelity,
        per_qubit_metrics,
    }
}

/// Convenience: does a physical qubit id appear as `QubitId` anywhere?
/// Used by router implementations that need to reconcile logical/physical
/// qubit spaces with `compute_metrics`' physical-indexed maps.
#[must_use]
pub fn as_physical(qubit: QubitId) -> u32 {
    qubit.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::CouplingMap;
    use crate::topology::{Calibration, GateCalibration, QubitCalibration, Topology};
    use qforge_ir::{Circuit, QubitId};

    fn bell_dag() -> CircuitDag {
        Circuit::bell().unwrap().into_dag()
    }

    #[test]
    fn uncalibrated_topology_uses_defaults() {
        let dag = bell_dag();
        let topo = Topology::new("t", CouplingMap::linear(2), crate::property::BasisGates::universal());
        let layout = Layout::trivial(2);
        let metrics = compute_metrics(&dag, &dag, &layout, &topo, 0);

        assert_eq!(metrics.total_gates, 2);
        assert!(metrics.fidelity > 0.0 && metrics.fidelity < 1.0);
        assert_eq!(metrics.effective_error, 1.0 - metrics.fidelity);
    }

    #[test]
    fn fidelity_is_one_without_error_sources() {
        let dag = bell_dag();
        let mut cal = Calibration::new();
        cal.gates.push(GateCalibration {
            name: "h".into(),
            qubits: vec![0],
            gate_error: Some(0.0),
            duration: Some(0.0),
        });
        cal.gates.push(GateCalibration {
            name: "cx".into(),
            qubits: vec![0, 1],
            gate_error: Some(0.0),
            duration: Some(0.0),
        });
        cal.build_index();
        let topo = Topology::new("t", CouplingMap::linear(2), crate::property::BasisGates::universal())
            .with_calibration(cal);
        let layout = Layout::trivial(2);

        let metrics = compute_metrics(&dag, &dag, &layout, &topo, 0);
        assert!((metrics.fidelity - 1.0).abs() < 1e-12);
        assert!((metrics.effective_error).abs() < 1e-12);
    }

    #[test]
    fn decoherence_scales_with_execution_time() {
        // T1/T2 of 100us/80us against a 300ns gate duration: three orders of
        // magnitude apart, so decoherence should be small but nonzero.
        let dag = bell_dag();
        let mut cal = Calibration::new();
        cal.qubits.push(QubitCalibration {
            index: 0,
            t1: Some(100e-6),
            t2: Some(80e-6),
            readout_error: None,
        });
        cal.qubits.push(QubitCalibration {
            index: 1,
            t1: Some(100e-6),
            t2: Some(80e-6),
            readout_error: None,
        });
        cal.gates.push(GateCalibration {
            name: "cx".into(),
            qubits: vec![0, 1],
            gate_error: Some(0.0),
            duration: Some(300e-9),
        });
        cal.build_index();
        let topo = Topology::new("t", CouplingMap::linear(2), crate::property::BasisGates::universal())
            .with_calibration(cal);
        let layout = Layout::trivial(2);

        let metrics = compute_metrics(&dag, &dag, &layout, &topo, 0);
        assert!(metrics.per_qubit_metrics[&0].t_exec >= 300e-9);
        assert!(metrics.avg_decoherence_error > 0.0);
        assert!(
            metrics.per_qubit_metrics[&0].decoherence_fidelity > 0.99,
            "a gate duration three orders of magnitude below T1/T2 should barely dent fidelity, got {}",
            metrics.per_qubit_metrics[&0].decoherence_fidelity
        );
    }

    #[test]
    fn readout_error_averages_over_calibrated_qubits_only() {
        let dag = bell_dag();
        let mut cal = Calibration::new();
        cal.qubits.push(QubitCalibration {
            index: 0,
            t1: None,
            t2: None,
            readout_error: Some(0.02),
        });
        cal.build_index();
        let topo = Topology::new("t", CouplingMap::linear(2), crate::property::BasisGates::universal())
            .with_calibration(cal);
        let layout = Layout::trivial(2);

        let metrics = compute_metrics(&dag, &dag, &layout, &topo, 0);
        assert!((metrics.avg_readout_error - 0.02).abs() < 1e-12);
        assert_eq!(metrics.per_qubit_metrics[&1].readout_error, None);
    }

    #[test]
    fn per_qubit_metrics_keys_are_physical() {
        let dag = bell_dag();
        let topo = Topology::new("t", CouplingMap::linear(2), crate::property::BasisGates::universal());
        // Non-trivial embedding: logical 0 -> physical 1, logical 1 -> physical 0.
        let mut layout = Layout::new();
        layout.add(QubitId(0), 1);
        layout.add(QubitId(1), 0);

        let metrics = compute_metrics(&dag, &dag, &layout, &topo, 0);
        assert!(metrics.per_qubit_metrics.contains_key(&0));
        assert!(metrics.per_qubit_metrics.contains_key(&1));
    }
}
