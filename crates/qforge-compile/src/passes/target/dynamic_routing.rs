//! Dynamic router: SWAP-induced embedding changes are kept.

use qforge_ir::{CircuitDag, QubitId};

use super::router_support::{route_flat, RouterStats};
use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Routes a circuit, letting each SWAP chain's permutation of the
/// embedding stand rather than undoing it.
///
/// Structurally identical to [`super::NaiveRouting`] — same streaming,
/// shortest-path-driven walk over the operation list — but every SWAP it
/// inserts to bring a gate's operands together is kept rather than
/// unwound afterwards, so the embedding drifts over the course of the
/// circuit.
pub struct DynamicRouting;

impl Pass for DynamicRouting {
    fn name(&self) -> &str {
        "DynamicRouting"
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

        let routed = route_flat(&ops, &mut layout, &coupling_map, &basis_gates, &mut stats, false)?;

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
    use qforge_ir::{Circuit, QubitId};

    #[test]
    fn embedding_drifts_after_swap() {
        // linear(5): 0-1-2-3-4. q0,q2 are distance 2 apart.
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props =
            PropertySet::new().with_target(CouplingMap::linear(5), BasisGates::new(["cx", "swap"]));
        TrivialLayout.run(&mut dag, &mut props).unwrap();
        DynamicRouting.run(&mut dag, &mut props).unwrap();

        let stats = props.get::<RouterStats>().unwrap();
        assert_eq!(stats.n_swap_gates, 1);

        // Unlike the naive router, the embedding is NOT restored to identity.
        let layout = props.layout.as_ref().unwrap();
        assert_ne!(layout.get_physical(QubitId(0)), Some(0));
    }

    #[test]
    fn subsequent_gate_uses_drifted_embedding() {
        // After routing q0-q2, layout has drifted; a follow-up gate on the
        // qubits that ended up adjacent shouldn't need another SWAP.
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props =
            PropertySet::new().with_target(CouplingMap::linear(5), BasisGates::new(["cx", "swap"]));
        TrivialLayout.run(&mut dag, &mut props).unwrap();
        DynamicRouting.run(&mut dag, &mut props).unwrap();

        let coupling_map = props.coupling_map.as_ref().unwrap();
        for (_, inst) in dag.topological_ops() {
            if inst.qubits.len() == 2 {
                assert!(coupling_map.is_connected(inst.qubits[0].0, inst.qubits[1].0));
            }
        }
    }
}
