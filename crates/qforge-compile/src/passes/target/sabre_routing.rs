//! SABRE-style router: greedy front-layer execution with lookahead SWAP
//! scoring.

use qforge_ir::{CircuitDag, Instruction, InstructionKind, QubitId};

use super::dependency::{build_predecessors, front_layer};
use super::router_support::{emit_swap, remap_instruction, remap_qubits, RouterStats};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, CouplingMap, Layout, PropertySet};
use crate::topology::{Calibration, DEFAULT_GATE_ERROR};

/// Routes a circuit by repeatedly executing whatever is ready in the front
/// layer and, when the front layer is entirely blocked on connectivity,
/// inserting the single SWAP that most reduces the total physical distance
/// the blocked operations still have to close.
pub struct SabreRouting {
    /// Maximum SWAPs tried consecutively without making progress before a
    /// blocked operation is judged unroutable.
    pub swap_budget: usize,
}

impl Default for SabreRouting {
    fn default() -> Self {
        Self { swap_budget: 20 }
    }
}

impl Pass for SabreRouting {
    fn name(&self) -> &str {
        "SabreRouting"
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
        let mut layout = properties
            .layout
            .clone()
            .ok_or(CompileError::MissingLayout)?;

        let ops: Vec<_> = dag.topological_ops().map(|(_, inst)| inst.clone()).collect();
        let mut stats = RouterStats::new();

        let routed = sabre_route(
            &ops,
            &mut layout,
            &coupling_map,
            &basis_gates,
            properties.calibration.as_ref(),
            self.swap_budget,
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
        properties.coupling_map.is_some()
            && properties.layout.is_some()
            && properties.basis_gates.is_some()
    }
}

/// Front-layer-driven routing of a flat operation list, recursing into
/// control-flow bodies against the same (threaded-through) layout.
pub(crate) fn sabre_route(
    ops: &[Instruction],
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    basis_gates: &BasisGates,
    calibration: Option<&Calibration>,
    swap_budget: usize,
    stats: &mut RouterStats,
) -> CompileResult<Vec<Instruction>> {
    route_with_penalty(ops, layout, coupling_map, basis_gates, calibration, swap_budget, 0.0, stats)
}

/// Identical to [`sabre_route`], but every candidate SWAP's score is
/// additionally penalized by `penalty_per_error * swap_cx_error` — used by
/// [`super::CalibrationAwareRouting`] to disfavor high-error links.
#[allow(clippy::too_many_arguments)]
pub(crate) fn route_with_penalty(
    ops: &[Instruction],
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    basis_gates: &BasisGates,
    calibration: Option<&Calibration>,
    swap_budget: usize,
    penalty_per_error: f64,
    stats: &mut RouterStats,
) -> CompileResult<Vec<Instruction>> {
    let preds = build_predecessors(ops);
    let mut executed = vec![false; ops.len()];
    let mut out = Vec::with_capacity(ops.len());
    let outer_cap = ops.len().saturating_mul(swap_budget.max(1)).max(1);
    let mut stuck = 0usize;

    while !executed.iter().all(|&e| e) {
        stats.iterations += 1;
        if stats.iterations > outer_cap {
            return Err(CompileError::IterationCapExceeded);
        }

        let front = front_layer(&executed, &preds);
        let mut progressed = false;
        let mut blocked = Vec::new();

        for &idx in &front {
            let inst = &ops[idx];
            if inst.is_control_flow() {
                out.push(route_control_flow(
                    inst,
                    layout,
                    coupling_map,
                    basis_gates,
                    calibration,
                    swap_budget,
                    penalty_per_error,
                    stats,
                )?);
                executed[idx] = true;
                progressed = true;
            } else if inst.is_gate() && inst.qubits.len() == 2 {
                let q0 = inst.qubits[0];
                let q1 = inst.qubits[1];
                let p0 = layout.get_physical(q0).ok_or(CompileError::MissingLayout)?;
                let p1 = layout.get_physical(q1).ok_or(CompileError::MissingLayout)?;
                if coupling_map.is_connected(p0, p1) {
                    out.push(remap_instruction(inst, layout)?);
                    executed[idx] = true;
                    progressed = true;
                } else {
                    blocked.push(idx);
                }
            } else {
                out.push(remap_instruction(inst, layout)?);
                executed[idx] = true;
                progressed = true;
                for &q in &inst.qubits {
                    if let Some(p) = layout.get_physical(q) {
                        stats.record_qubit(p);
                    }
                }
            }
        }

        if progressed {
            stuck = 0;
            continue;
        }

        if blocked.is_empty() {
            break;
        }

        stuck += 1;
        if stuck > swap_budget {
            return Err(CompileError::SwapBudgetExceeded {
                gate_index: blocked[0],
                budget: swap_budget,
            });
        }

        let blocked_pairs: Vec<(QubitId, QubitId)> = blocked
            .iter()
            .map(|&idx| (ops[idx].qubits[0], ops[idx].qubits[1]))
            .collect();

        let (p0, p1) = best_swap(layout, coupling_map, calibration, &blocked_pairs, penalty_per_error)
            .ok_or_else(|| CompileError::RoutingFailed {
                qubit1: blocked_pairs[0].0 .0,
                qubit2: blocked_pairs[0].1 .0,
            })?;

        out.extend(emit_swap(basis_gates, p0, p1));
        layout.swap(p0, p1);
        stats.record_qubit(p0);
        stats.record_qubit(p1);
        stats.n_swap_gates += 1;
    }

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn route_control_flow(
    inst: &Instruction,
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    basis_gates: &BasisGates,
    calibration: Option<&Calibration>,
    swap_budget: usize,
    penalty_per_error: f64,
    stats: &mut RouterStats,
) -> CompileResult<Instruction> {
    let mut out = inst.clone();
    match &mut out.kind {
        InstructionKind::ForLoop { body, .. } | InstructionKind::WhileLoop { body, .. } => {
            *body = route_with_penalty(
                body,
                layout,
                coupling_map,
                basis_gates,
                calibration,
                swap_budget,
                penalty_per_error,
                stats,
            )?;
        }
        InstructionKind::IfElse {
            if_body, else_body, ..
        } => {
            *if_body = route_with_penalty(
                if_body,
                layout,
                coupling_map,
                basis_gates,
                calibration,
                swap_budget,
                penalty_per_error,
                stats,
            )?;
            *else_body = route_with_penalty(
                else_body,
                layout,
                coupling_map,
                basis_gates,
                calibration,
                swap_budget,
                penalty_per_error,
                stats,
            )?;
        }
        _ => {}
    }
    out.qubits = remap_qubits(&inst.qubits, layout)?;
    Ok(out)
}

/// Pick the coupling-map edge whose SWAP best reduces total physical
/// distance over `blocked_pairs`' current positions, tie-broken by lowest
/// CX error then by lexicographically-lowest logical-qubit pair.
///
/// `penalty_per_error` lets the calibration-aware router subtract
/// `k * swap_cx_error` from the raw distance-reduction score; the plain
/// SABRE router passes `0.0` to disable it.
pub(crate) fn best_swap(
    layout: &Layout,
    coupling_map: &CouplingMap,
    calibration: Option<&Calibration>,
    blocked_pairs: &[(QubitId, QubitId)],
    penalty_per_error: f64,
) -> Option<(u32, u32)> {
    let mut best: Option<(f64, f64, (u32, u32), (u32, u32))> = None;

    for &(p0, p1) in coupling_map.edges() {
        let mut layout2 = layout.clone();
        layout2.swap(p0, p1);

        let mut score = 0.0;
        for &(l0, l1) in blocked_pairs {
            score += pair_distance(layout, l0, l1, coupling_map) - pair_distance(&layout2, l0, l1, coupling_map);
        }

        let cx_error = calibration.map_or(DEFAULT_GATE_ERROR, |c| c.gate_error("cx", &[p0, p1]));
        score -= penalty_per_error * cx_error;

        let l0 = layout.get_logical(p0).map_or(u32::MAX, |q| q.0);
        let l1 = layout.get_logical(p1).map_or(u32::MAX, |q| q.0);
        let key = if l0 <= l1 { (l0, l1) } else { (l1, l0) };

        let candidate = (score, cx_error, (p0, p1), key);
        best = Some(match best {
            None => candidate,
            Some(cur) => {
                if candidate.0 > cur.0 + f64::EPSILON {
                    candidate
                } else if (candidate.0 - cur.0).abs() <= f64::EPSILON {
                    if candidate.1 < cur.1 - f64::EPSILON {
                        candidate
                    } else if (candidate.1 - cur.1).abs() <= f64::EPSILON && candidate.3 < cur.3 {
                        candidate
                    } else {
                        cur
                    }
                } else {
                    cur
                }
            }
        });
    }

    best.map(|(_, _, pair, _)| pair)
}

fn pair_distance(layout: &Layout, l0: QubitId, l1: QubitId, coupling_map: &CouplingMap) -> f64 {
    match (layout.get_physical(l0), layout.get_physical(l1)) {
        (Some(p0), Some(p1)) => coupling_map.distance(p0, p1).map_or(f64::MAX, f64::from),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::target::TrivialLayout;
    use qforge_ir::{Circuit, QubitId};

    fn run_sabre(circuit: Circuit, coupling: CouplingMap, basis: BasisGates) -> (CircuitDag, PropertySet) {
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new().with_target(coupling, basis);
        TrivialLayout.run(&mut dag, &mut props).unwrap();
        SabreRouting::default().run(&mut dag, &mut props).unwrap();
        (dag, props)
    }

    #[test]
    fn adjacent_gates_need_no_swaps() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let (dag, props) = run_sabre(circuit, CouplingMap::linear(4), BasisGates::new(["h", "cx", "swap"]));

        let stats = props.get::<RouterStats>().unwrap();
        assert_eq!(stats.n_swap_gates, 0);
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn four_qubit_linear_chain_routes_without_error() {
        // A chain of CX gates spanning the full linear(4) topology, each
        // gate touching qubits that are progressively farther apart.
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.cx(QubitId(1), QubitId(3)).unwrap();
        let (dag, props) = run_sabre(circuit, CouplingMap::linear(4), BasisGates::new(["cx", "swap"]));

        let coupling_map = props.coupling_map.as_ref().unwrap();
        for (_, inst) in dag.topological_ops() {
            if inst.qubits.len() == 2 {
                assert!(coupling_map.is_connected(inst.qubits[0].0, inst.qubits[1].0));
            }
        }
    }

    #[test]
    fn every_physical_qubit_index_in_range() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        let (dag, _props) = run_sabre(circuit, CouplingMap::linear(4), BasisGates::new(["cx", "swap"]));

        for (_, inst) in dag.topological_ops() {
            for q in &inst.qubits {
                assert!(q.0 < 4);
            }
        }
    }
}
