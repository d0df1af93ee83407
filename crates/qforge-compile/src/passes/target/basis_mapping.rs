//! Basis mapping: decompose canonical gates into a target's native set.
//!
//! The canonical gate set produced by [`crate::passes::GateNormalization`]
//! is `{rx, ry, rz, h, s, t, x, y, z, cx, cz}`. A target's native set is a
//! subset of `{rz, sx, x, id, cz, cx, rx, ry, h, s, t, swap}`. This pass
//! rewrites every gate not already in the target set using the fixed
//! decomposition table below, verified up to global phase.

use std::f64::consts::PI;

use qforge_ir::{
    CircuitDag, Gate, GateKind, Instruction, InstructionKind, ParameterExpression, QubitId,
    StandardGate,
};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};

/// Decomposes every operation not already native to `target_set` using the
/// fixed decomposition table.
///
/// Like [`crate::passes::GateNormalization`], this rebuilds the DAG from
/// scratch in topological order rather than rewriting nodes in place:
/// `substitute_node` appends a replacement at the wire's current end,
/// which is wrong here since a decomposition must occupy the exact
/// position of the gate it replaces, not the end of the circuit.
pub struct BasisMapping;

impl Pass for BasisMapping {
    fn name(&self) -> &str {
        "BasisMapping"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let target = properties
            .basis_gates
            .as_ref()
            .ok_or(CompileError::MissingBasisGates)?
            .clone();

        let mut new_dag = CircuitDag::new();
        for qubit in dag.qubits().collect::<Vec<_>>() {
            new_dag.add_qubit(qubit);
        }
        for clbit in dag.clbits().collect::<Vec<_>>() {
            new_dag.add_clbit(clbit);
        }
        new_dag.set_global_phase(dag.global_phase());
        new_dag.set_level(dag.level());

        for (_idx, inst) in dag.topological_ops() {
            for mapped in map_instruction(inst, &target)? {
                new_dag.apply(mapped)?;
            }
        }

        *dag = new_dag;
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.basis_gates.is_some()
    }
}

fn map_instruction(inst: &Instruction, target: &BasisGates) -> CompileResult<Vec<Instruction>> {
    if inst.is_control_flow() {
        return Ok(vec![map_control_flow(inst, target)?]);
    }

    let Some(gate) = inst.as_gate() else {
        return Ok(vec![inst.clone()]);
    };

    if target.contains(gate.name()) {
        return Ok(vec![inst.clone()]);
    }

    decompose(inst, gate, target)
}

fn map_control_flow(inst: &Instruction, target: &BasisGates) -> CompileResult<Instruction> {
    let mut out = inst.clone();
    match &mut out.kind {
        InstructionKind::ForLoop { body, .. } | InstructionKind::WhileLoop { body, .. } => {
            *body = map_body(body, target)?;
        }
        InstructionKind::IfElse {
            if_body, else_body, ..
        } => {
            *if_body = map_body(if_body, target)?;
            *else_body = map_body(else_body, target)?;
        }
        _ => {}
    }
    Ok(out)
}

fn map_body(body: &[Instruction], target: &BasisGates) -> CompileResult<Vec<Instruction>> {
    let mut out = Vec::with_capacity(body.len());
    for inst in body {
        out.extend(map_instruction(inst, target)?);
    }
    Ok(out)
}

/// Apply the decomposition table to a single gate not already native
/// to `target`.
#[allow(clippy::too_many_lines)]
fn decompose(source: &Instruction, gate: &Gate, target: &BasisGates) -> CompileResult<Vec<Instruction>> {
    let GateKind::Standard(std_gate) = &gate.kind else {
        return Err(unsupported(gate.name(), target));
    };

    let has = |name: &str| target.contains(name);
    let qubits = &source.qubits;
    let q0 = qubits[0];

    let children: Vec<Instruction> = match std_gate {
        StandardGate::H if has("sx") && has("rz") => vec![
            sx(q0),
            rz(PI / 2.0, q0),
            sx(q0),
        ],
        StandardGate::X if has("sx") => vec![sx(q0), sx(q0)],
        StandardGate::X if has("rx") => vec![rx(PI, q0)],
        StandardGate::Z if has("rz") => vec![rz(PI, q0)],
        StandardGate::Y if has("sx") && has("rz") => vec![
            rz(-PI / 2.0, q0),
            sx(q0),
            rz(PI / 2.0, q0),
            sx(q0),
            rz(PI, q0),
            sx(q0),
            rz(PI / 2.0, q0),
            sx(q0),
            rz(PI / 2.0, q0),
        ],
        StandardGate::S if has("rz") => vec![rz(PI / 2.0, q0)],
        StandardGate::T if has("rz") => vec![rz(PI / 4.0, q0)],
        StandardGate::Rx(theta) if has("sx") && has("rz") => {
            let theta = theta.as_f64().unwrap_or(0.0);
            vec![
                sx(q0),
                rz(PI / 2.0, q0),
                sx(q0),
                rz(theta, q0),
                sx(q0),
                rz(PI / 2.0, q0),
                sx(q0),
            ]
        }
        StandardGate::Ry(theta) if has("rx") && has("rz") => {
            let theta = theta.as_f64().unwrap_or(0.0);
            vec![rz(-PI / 2.0, q0), rx(theta, q0), rz(PI / 2.0, q0)]
        }
        StandardGate::Ry(theta) if has("sx") && has("rz") => {
            let theta = theta.as_f64().unwrap_or(0.0);
            vec![
                rz(-PI / 2.0, q0),
                sx(q0),
                rz(PI / 2.0, q0),
                sx(q0),
                rz(theta, q0),
                sx(q0),
                rz(PI / 2.0, q0),
                sx(q0),
                rz(PI / 2.0, q0),
            ]
        }
        StandardGate::CX if has("cz") && has("sx") && has("rz") => {
            let c = qubits[0];
            let t = qubits[1];
            vec![
                sx(t),
                rz(PI / 2.0, t),
                sx(t),
                cz(c, t),
                sx(t),
                rz(PI / 2.0, t),
                sx(t),
            ]
        }
        StandardGate::Swap if has("cx") => {
            let (a, b) = (qubits[0], qubits[1]);
            vec![cx(a, b), cx(b, a), cx(a, b)]
        }
        _ => return Err(unsupported(gate.name(), target)),
    };

    Ok(children
        .into_iter()
        .map(|child| carry_over(child, source))
        .collect())
}

fn unsupported(gate: &str, target: &BasisGates) -> CompileError {
    CompileError::UnsupportedDecomposition {
        gate: gate.to_string(),
        target_basis: target.gates().join(","),
    }
}

fn carry_over(mut child: Instruction, source: &Instruction) -> Instruction {
    child.clbits = source.clbits.clone();
    child.condition = source.condition.clone();
    child.metadata = source.metadata.clone();
    child
}

fn rz(theta: f64, q: QubitId) -> Instruction {
    Instruction::single_qubit_gate(StandardGate::Rz(ParameterExpression::constant(theta)), q)
}

fn rx(theta: f64, q: QubitId) -> Instruction {
    Instruction::single_qubit_gate(StandardGate::Rx(ParameterExpression::constant(theta)), q)
}

fn sx(q: QubitId) -> Instruction {
    Instruction::single_qubit_gate(StandardGate::SX, q)
}

fn cz(q0: QubitId, q1: QubitId) -> Instruction {
    Instruction::two_qubit_gate(StandardGate::CZ, q0, q1)
}

fn cx(q0: QubitId, q1: QubitId) -> Instruction {
    Instruction::two_qubit_gate(StandardGate::CX, q0, q1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qforge_ir::{Circuit, QubitId};

    fn gate_names(dag: &CircuitDag) -> Vec<String> {
        dag.topological_ops()
            .filter_map(|(_, inst)| inst.as_gate().map(|g| g.name().to_string()))
            .collect()
    }

    #[test]
    fn h_maps_to_sx_rz_sx() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props =
            PropertySet::new().with_target(crate::property::CouplingMap::linear(1), BasisGates::new(["rz", "sx", "cz"]));

        BasisMapping.run(&mut dag, &mut props).unwrap();
        assert_eq!(gate_names(&dag), vec!["sx", "rz", "sx"]);
    }

    #[test]
    fn x_maps_to_two_sx() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.x(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props =
            PropertySet::new().with_target(crate::property::CouplingMap::linear(1), BasisGates::new(["rz", "sx", "cz"]));

        BasisMapping.run(&mut dag, &mut props).unwrap();
        assert_eq!(gate_names(&dag), vec!["sx", "sx"]);
    }

    #[test]
    fn cx_maps_to_seven_ops_on_rz_sx_cz() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props =
            PropertySet::new().with_target(crate::property::CouplingMap::linear(2), BasisGates::new(["rz", "sx", "cz"]));

        BasisMapping.run(&mut dag, &mut props).unwrap();
        let names = gate_names(&dag);
        assert_eq!(names.len(), 7);
        assert_eq!(names.iter().filter(|n| *n == "cz").count(), 1);
    }

    #[test]
    fn native_gates_pass_through() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let before = circuit.dag().num_ops();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new()
            .with_target(crate::property::CouplingMap::linear(2), BasisGates::new(["cx", "h"]));

        BasisMapping.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), before);
    }

    #[test]
    fn unmappable_gate_is_an_error() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.y(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new()
            .with_target(crate::property::CouplingMap::linear(1), BasisGates::new(["rz", "cx"]));

        let result = BasisMapping.run(&mut dag, &mut props);
        assert!(matches!(
            result,
            Err(CompileError::UnsupportedDecomposition { .. })
        ));
    }

    #[test]
    fn metadata_and_condition_survive_decomposition() {
        use qforge_ir::ClassicalCondition;

        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_clbit(qforge_ir::ClbitId(0));
        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0))
            .with_condition(ClassicalCondition::new("c", 1));
        dag.apply(inst).unwrap();

        let mut props = PropertySet::new()
            .with_target(crate::property::CouplingMap::linear(1), BasisGates::new(["rz", "sx"]));
        BasisMapping.run(&mut dag, &mut props).unwrap();

        for (_, inst) in dag.topological_ops() {
            assert_eq!(inst.condition, Some(ClassicalCondition::new("c", 1)));
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum GateOp {
        H(u32),
        X(u32),
        Y(u32),
        Z(u32),
        S(u32),
        T(u32),
        Rx(u32),
        Ry(u32),
        Rz(u32),
        Cx(u32, u32),
        Cz(u32, u32),
    }

    impl GateOp {
        fn apply(self, circuit: &mut Circuit) {
            use qforge_ir::ParameterExpression as PE;
            match self {
                GateOp::H(q) => {
                    let _ = circuit.h(QubitId(q));
                }
                GateOp::X(q) => {
                    let _ = circuit.x(QubitId(q));
                }
                GateOp::Y(q) => {
                    let _ = circuit.y(QubitId(q));
                }
                GateOp::Z(q) => {
                    let _ = circuit.z(QubitId(q));
                }
                GateOp::S(q) => {
                    let _ = circuit.s(QubitId(q));
                }
                GateOp::T(q) => {
                    let _ = circuit.t(QubitId(q));
                }
                GateOp::Rx(q) => {
                    let _ = circuit.rx(PE::constant(0.7), QubitId(q));
                }
                GateOp::Ry(q) => {
                    let _ = circuit.ry(PE::constant(0.7), QubitId(q));
                }
                GateOp::Rz(q) => {
                    let _ = circuit.rz(PE::constant(0.7), QubitId(q));
                }
                GateOp::Cx(c, t) => {
                    let _ = circuit.cx(QubitId(c), QubitId(t));
                }
                GateOp::Cz(c, t) => {
                    let _ = circuit.cz(QubitId(c), QubitId(t));
                }
            }
        }
    }

    fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
        prop_oneof![
            (0..num_qubits).prop_map(GateOp::H),
            (0..num_qubits).prop_map(GateOp::X),
            (0..num_qubits).prop_map(GateOp::Y),
            (0..num_qubits).prop_map(GateOp::Z),
            (0..num_qubits).prop_map(GateOp::S),
            (0..num_qubits).prop_map(GateOp::T),
            (0..num_qubits).prop_map(GateOp::Rx),
            (0..num_qubits).prop_map(GateOp::Ry),
            (0..num_qubits).prop_map(GateOp::Rz),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("distinct qubits", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::Cx(c, t)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("distinct qubits", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::Cz(c, t)),
        ]
    }

    /// A canonical circuit: every op is already in
    /// [`crate::passes::agnostic::normalize::CANONICAL_SET`].
    fn arb_canonical_circuit() -> impl Strategy<Value = Circuit> {
        (2_u32..=4).prop_flat_map(|num_qubits| {
            prop::collection::vec(arb_gate_op(num_qubits), 1..=12).prop_map(move |ops| {
                let mut circuit = Circuit::with_size("prop", num_qubits, 0);
                for op in ops {
                    op.apply(&mut circuit);
                }
                circuit
            })
        })
    }

    proptest! {
        /// Every op of `map_to_basis(c, S)` has a name in `S` for canonical
        /// `c` (universal invariant 2).
        #[test]
        fn every_mapped_op_is_in_the_target_basis(circuit in arb_canonical_circuit()) {
            let target = BasisGates::new(["rz", "sx", "cz", "cx"]);
            let mut dag = circuit.into_dag();
            let mut props = PropertySet::new()
                .with_target(crate::property::CouplingMap::full(4), target.clone());

            BasisMapping.run(&mut dag, &mut props).unwrap();

            for name in gate_names(&dag) {
                prop_assert!(target.contains(&name), "mapped op '{name}' not in target basis");
            }
        }
    }
}
