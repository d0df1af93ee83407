//! Calibration-aware router: a quality-driven initial embedding plus
//! error-weighted SWAP scoring.

use rustc_hash::{FxHashMap, FxHashSet};

use qforge_ir::{CircuitDag, QubitId};

use super::router_support::RouterStats;
use super::sabre_routing::route_with_penalty;
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};
use crate::topology::Calibration;

/// Default weight given to readout fidelity vs. coherence in the initial
/// embedding's qubit-quality score.
pub const DEFAULT_READOUT_WEIGHT: f64 = 0.5;
pub const DEFAULT_COHERENCE_WEIGHT: f64 = 0.5;

/// Default per-error penalty `k` subtracted from a candidate SWAP's
/// distance-reduction score: `score - k * swap_cx_error`.
pub const DEFAULT_ERROR_PENALTY: f64 = 10.0;

/// Routes a circuit like [`super::SabreRouting`], but picks its own initial
/// embedding by searching for the highest-quality connected cluster of
/// physical qubits, and penalizes high-error SWAP candidates during
/// front-layer unblocking.
pub struct CalibrationAwareRouting {
    pub swap_budget: usize,
    pub readout_weight: f64,
    pub coherence_weight: f64,
    pub error_penalty: f64,
}

impl Default for CalibrationAwareRouting {
    fn default() -> Self {
        Self {
            swap_budget: 20,
            readout_weight: DEFAULT_READOUT_WEIGHT,
            coherence_weight: DEFAULT_COHERENCE_WEIGHT,
            error_penalty: DEFAULT_ERROR_PENALTY,
        }
    }
}

impl Pass for CalibrationAwareRouting {
    fn name(&self) -> &str {
        "CalibrationAwareRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .clone()
            .ok_or(CompileError::MissingCouplingMap)?;
        let basis_gates = properties
            .basis_gates
            .clone()
            .ok_or(CompileError::MissingBasisGates)?;

        let num_logical = dag.qubits().count() as u32;
        let mut stats = RouterStats::new();

        let mut layout = choose_initial_layout(
            num_logical,
            &coupling_map,
            properties.calibration.as_ref(),
            self.readout_weight,
            self.coherence_weight,
            &mut stats,
        );

        let ops: Vec<_> = dag.topological_ops().map(|(_, inst)| inst.clone()).collect();
        let routed = route_with_penalty(
            &ops,
            &mut layout,
            &coupling_map,
            &basis_gates,
            properties.calibration.as_ref(),
            self.swap_budget,
            self.error_penalty,
            &mut stats,
        )?;

        let mut new_dag = CircuitDag::new();
        for physical in 0..coupling_map.num_qubits() {
            new_dag.add_qubit(QubitId(physical));
        }
        for clbit in dag.clbits().collect::<Vec<_>>() {
            new_dag.add_clbit(clbit);
        }
        for inst in routed {
            new_dag.apply(inst)?;
        }
        new_dag.set_global_phase(dag.global_phase());
        new_dag.set_level(dag.level());
        *dag = new_dag;

        properties.layout = Some(layout);
        properties.insert(stats);

        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some() && properties.basis_gates.is_some()
    }
}

/// Choose an initial embedding by growing, from every possible starting
/// physical qubit, a connected cluster of size `num_logical` via
/// greedy best-neighbor expansion, then keeping the cluster with the
/// highest total [`Calibration::qubit_quality`]. Falls back to a
/// connectivity-blind ranking (with a recorded warning) if no connected
/// cluster of the right size exists.
fn choose_initial_layout(
    num_logical: u32,
    coupling_map: &CouplingMap,
    calibration: Option<&Calibration>,
    readout_weight: f64,
    coherence_weight: f64,
    stats: &mut RouterStats,
) -> Layout {
    let num_physical = coupling_map.num_qubits();
    let quality: FxHashMap<u32, f64> = (0..num_physical)
        .map(|p| {
            let q = calibration.map_or(0.5, |c| c.qubit_quality(p, readout_weight, coherence_weight));
            (p, q)
        })
        .collect();

    if num_logical == 0 {
        return Layout::new();
    }

    let mut best_cluster: Option<(Vec<u32>, f64)> = None;
    for start in 0..num_physical {
        if let Some((cluster, total)) = grow_cluster(start, num_logical, coupling_map, &quality) {
            let better = best_cluster
                .as_ref()
                .is_none_or(|(_, best_total)| total > *best_total);
            if better {
                best_cluster = Some((cluster, total));
            }
        }
    }

    let chosen = match best_cluster {
        Some((cluster, _)) => cluster,
        None => {
            stats.warn(format!(
                "no connected cluster of {num_logical} physical qubits found; \
                 falling back to a connectivity-blind quality ranking"
            ));
            let mut ranked: Vec<u32> = (0..num_physical).collect();
            ranked.sort_by(|&a, &b| {
                quality[&b]
                    .partial_cmp(&quality[&a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked.into_iter().take(num_logical as usize).collect()
        }
    };

    let mut layout = Layout::new();
    for (logical, &physical) in chosen.iter().enumerate() {
        layout.add(QubitId(logical as u32), physical);
        stats.record_qubit(physical);
    }
    layout
}

fn grow_cluster(
    start: u32,
    size: u32,
    coupling_map: &CouplingMap,
    quality: &FxHashMap<u32, f64>,
) -> Option<(Vec<u32>, f64)> {
    let size = size as usize;
    let mut cluster = vec![start];
    let mut in_cluster: FxHashSet<u32> = [start].into_iter().collect();
    let mut total = quality.get(&start).copied().unwrap_or(0.5);

    while cluster.len() < size {
        let mut best: Option<(u32, f64)> = None;
        for &member in &cluster {
            for neighbor in coupling_map.neighbors(member) {
                if in_cluster.contains(&neighbor) {
                    continue;
                }
                let q = quality.get(&neighbor).copied().unwrap_or(0.5);
                if best.is_none_or(|(_, best_q)| q > best_q) {
                    best = Some((neighbor, q));
                }
            }
        }
        match best {
            Some((neighbor, q)) => {
                cluster.push(neighbor);
                in_cluster.insert(neighbor);
                total += q;
            }
            None => return None,
        }
    }

    Some((cluster, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BasisGates, CouplingMap as CM};
    use crate::topology::{GateCalibration, QubitCalibration};
    use qforge_ir::Circuit;

    fn calibration_with_hot_qubit(hot: u32, n: u32) -> Calibration {
        let mut cal = Calibration::new();
        for i in 0..n {
            let mut q = QubitCalibration::new(i);
            q.readout_error = Some(if i == hot { 0.001 } else { 0.1 });
            q.t2 = Some(if i == hot { 150e-6 } else { 20e-6 });
            cal.qubits.push(q);
        }
        cal.gates.push(GateCalibration {
            name: "cx".to_string(),
            qubits: vec![0, 1],
            gate_error: Some(0.001),
            duration: None,
        });
        cal.build_index();
        cal
    }

    #[test]
    fn initial_embedding_prefers_high_quality_cluster() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let cal = calibration_with_hot_qubit(3, 5);
        let mut props = PropertySet::new()
            .with_target(CM::linear(5), BasisGates::new(["cx", "swap"]))
            .with_calibration(cal);

        CalibrationAwareRouting::default().run(&mut dag, &mut props).unwrap();

        let layout = props.layout.as_ref().unwrap();
        // The best 2-qubit connected cluster around the hot qubit (index 3,
        // linear neighbors 2 and 4) should include physical qubit 3.
        let used: Vec<u32> = (0..2).filter_map(|l| layout.get_physical(QubitId(l))).collect();
        assert!(used.contains(&3));
    }

    #[test]
    fn falls_back_and_warns_when_no_connected_cluster_fits() {
        // A 2-qubit coupling map (disconnected) can't host a 3-qubit
        // connected cluster; the router must fall back and record why.
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let mut coupling = CM::new(3);
        coupling.add_edge(0, 1);
        coupling.rebuild_caches();

        let mut props = PropertySet::new().with_target(coupling, BasisGates::new(["h", "cx", "swap"]));
        CalibrationAwareRouting::default().run(&mut dag, &mut props).unwrap();

        let stats = props.get::<RouterStats>().unwrap();
        assert!(!stats.warnings.is_empty());
    }
}
