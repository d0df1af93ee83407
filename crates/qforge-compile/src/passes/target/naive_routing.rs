//! Naive router: a fixed embedding perturbed only locally.

use qforge_ir::{CircuitDag, QubitId};

use super::router_support::{route_flat, RouterStats};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Routes a circuit while holding the embedding fixed.
///
/// Every two-qubit gate that needs connectivity it doesn't have gets a
/// SWAP chain that brings its operands adjacent, the gate, and then the
/// *same* chain run in reverse to restore the embedding — so between
/// gates the mapping from logical to physical qubits never changes.
pub struct NaiveRouting;

impl Pass for NaiveRouting {
    fn name(&self) -> &str {
        "NaiveRouting"
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
        stats.iterations = 1;

        let routed = route_flat(&ops, &mut layout, &coupling_map, &basis_gates, &mut stats, true)?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::target::{RouterStats, TrivialLayout};
    use crate::property::{BasisGates, CouplingMap};
    use qforge_ir::{Circuit, InstructionKind, QubitId};

    fn run_naive(circuit: Circuit, coupling: CouplingMap, basis: BasisGates) -> (CircuitDag, PropertySet) {
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new().with_target(coupling, basis);
        TrivialLayout.run(&mut dag, &mut props).unwrap();
        NaiveRouting.run(&mut dag, &mut props).unwrap();
        (dag, props)
    }

    #[test]
    fn adjacent_gate_needs_no_swaps() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let (dag, props) = run_naive(circuit, CouplingMap::linear(5), BasisGates::new(["h", "cx"]));

        let stats = props.get::<RouterStats>().unwrap();
        assert_eq!(stats.n_swap_gates, 0);
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn distance_two_gate_needs_swap_there_and_back() {
        // linear(5): 0-1-2-3-4. q0,q2 are distance 2 apart.
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let (dag, props) = run_naive(circuit, CouplingMap::linear(5), BasisGates::new(["cx", "swap"]));

        let stats = props.get::<RouterStats>().unwrap();
        assert_eq!(stats.n_swap_gates, 2);

        // The embedding must be restored to identity after the unwind.
        let layout = props.layout.as_ref().unwrap();
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(1)), Some(1));
        assert_eq!(layout.get_physical(QubitId(2)), Some(2));
    }

    #[test]
    fn swap_decomposes_to_cx_when_swap_not_native() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let (dag, _props) = run_naive(circuit, CouplingMap::linear(5), BasisGates::new(["cx"]));

        let names: Vec<_> = dag
            .topological_ops()
            .filter_map(|(_, inst)| {
                if let InstructionKind::Gate(g) = &inst.kind {
                    Some(g.name().to_string())
                } else {
                    None
                }
            })
            .collect();
        assert!(names.iter().all(|n| n != "swap"));
        assert_eq!(names.iter().filter(|n| *n == "cx").count(), 1 + 2 * 3);
    }

    #[test]
    fn all_two_qubit_gates_respect_connectivity() {
        let mut circuit = Circuit::with_size("test", 4, 0);
        circuit.cx(QubitId(0), QubitId(3)).unwrap();
        let (dag, props) = run_naive(circuit, CouplingMap::linear(5), BasisGates::new(["cx", "swap"]));

        let coupling_map = props.coupling_map.as_ref().unwrap();
        for (_, inst) in dag.topological_ops() {
            if inst.qubits.len() == 2 {
                assert!(coupling_map.is_connected(inst.qubits[0].0, inst.qubits[1].0));
            }
        }
    }
}
