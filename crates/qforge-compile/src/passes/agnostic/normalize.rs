//! Gate normalisation: rewrite every operation into the canonical gate set.
//!
//! The canonical set `C = {rx, ry, rz, h, s, t, x, y, z, cx, cz}` is the
//! common vocabulary the rest of the pipeline (basis mapping, routing)
//! is written against. Two rewrite rules apply beyond passthrough:
//! `u3(θ,φ,λ) → rz(φ); rx(θ); rz(λ)` and `swap → cx; cx; cx`. Everything
//! else already in `C` passes through unchanged.

use qforge_ir::{CircuitDag, Gate, GateKind, Instruction, InstructionKind, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// The canonical gate names every normalised operation must belong to.
pub const CANONICAL_SET: &[&str] = &["rx", "ry", "rz", "h", "s", "t", "x", "y", "z", "cx", "cz"];

fn is_canonical(name: &str) -> bool {
    CANONICAL_SET.contains(&name)
}

/// Rewrites every non-control-flow operation into the canonical gate set.
///
/// Rebuilds the DAG from scratch in topological order (see
/// [`crate::passes::target::BasisMapping`] for why `substitute_node` is the
/// wrong tool for a non-final-gate rewrite). Control-flow instructions are
/// passed through as opaque nodes, but their bodies are normalised
/// recursively so a `for_loop` over a `u3` still emits canonical gates.
pub struct GateNormalization;

impl Pass for GateNormalization {
    fn name(&self) -> &str {
        "GateNormalization"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
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
            for normalized in normalize_instruction(inst)? {
                new_dag.apply(normalized)?;
            }
        }

        *dag = new_dag;
        Ok(())
    }
}

/// Normalise one instruction, recursing into control-flow bodies.
fn normalize_instruction(inst: &Instruction) -> CompileResult<Vec<Instruction>> {
    if inst.is_control_flow() {
        return Ok(vec![normalize_control_flow(inst)?]);
    }

    let Some(gate) = inst.as_gate() else {
        // Measure, reset, barrier — nothing to rewrite.
        return Ok(vec![inst.clone()]);
    };

    if is_canonical(gate.name()) {
        return Ok(vec![inst.clone()]);
    }

    rewrite_gate(inst, gate)
}

fn normalize_control_flow(inst: &Instruction) -> CompileResult<Instruction> {
    let mut out = inst.clone();
    match &mut out.kind {
        InstructionKind::ForLoop { body, .. }
        | InstructionKind::WhileLoop { body, .. } => {
            *body = normalize_body(body)?;
        }
        InstructionKind::IfElse {
            if_body, else_body, ..
        } => {
            *if_body = normalize_body(if_body)?;
            *else_body = normalize_body(else_body)?;
        }
        _ => {}
    }
    Ok(out)
}

fn normalize_body(body: &[Instruction]) -> CompileResult<Vec<Instruction>> {
    let mut out = Vec::with_capacity(body.len());
    for inst in body {
        out.extend(normalize_instruction(inst)?);
    }
    Ok(out)
}

/// Apply the rewrite table to a single non-canonical gate instruction.
fn rewrite_gate(source: &Instruction, gate: &Gate) -> CompileResult<Vec<Instruction>> {
    let GateKind::Standard(std_gate) = &gate.kind else {
        return Err(CompileError::UnsupportedGate(gate.name().to_string()));
    };

    let qubits = &source.qubits;
    let children: Vec<Instruction> = match std_gate {
        StandardGate::U(theta, phi, lambda) => {
            let q0 = qubits[0];
            vec![
                Instruction::single_qubit_gate(StandardGate::Rz(phi.clone()), q0),
                Instruction::single_qubit_gate(StandardGate::Rx(theta.clone()), q0),
                Instruction::single_qubit_gate(StandardGate::Rz(lambda.clone()), q0),
            ]
        }
        StandardGate::Swap => {
            let (q0, q1) = (qubits[0], qubits[1]);
            vec![
                Instruction::two_qubit_gate(StandardGate::CX, q0, q1),
                Instruction::two_qubit_gate(StandardGate::CX, q1, q0),
                Instruction::two_qubit_gate(StandardGate::CX, q0, q1),
            ]
        }
        other => {
            return Err(CompileError::UnsupportedGate(format!(
                "{} has no normalisation rule into the canonical gate set",
                other.name()
            )));
        }
    };

    Ok(children
        .into_iter()
        .map(|child| carry_over(child, source))
        .collect())
}

/// Copy `clbits`, `condition`, and `metadata` from the source operation onto
/// a decomposition child, per the normaliser's metadata-preservation contract.
fn carry_over(mut child: Instruction, source: &Instruction) -> Instruction {
    child.clbits = source.clbits.clone();
    child.condition = source.condition.clone();
    child.metadata = source.metadata.clone();
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qforge_ir::{Circuit, ParameterExpression, QubitId};

    #[test]
    fn swap_expands_to_three_cx() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.swap(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();

        GateNormalization.run(&mut dag, &mut props).unwrap();

        let names: Vec<_> = dag
            .topological_ops()
            .filter_map(|(_, inst)| inst.as_gate().map(|g| g.name().to_string()))
            .collect();
        assert_eq!(names, vec!["cx", "cx", "cx"]);
    }

    #[test]
    fn u_gate_expands_to_rz_rx_rz() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit
            .u(
                ParameterExpression::constant(0.5),
                ParameterExpression::constant(0.25),
                ParameterExpression::constant(0.75),
                QubitId(0),
            )
            .unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();

        GateNormalization.run(&mut dag, &mut props).unwrap();

        let names: Vec<_> = dag
            .topological_ops()
            .filter_map(|(_, inst)| inst.as_gate().map(|g| g.name().to_string()))
            .collect();
        assert_eq!(names, vec!["rz", "rx", "rz"]);
    }

    #[test]
    fn canonical_gates_pass_through_unchanged() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let before = circuit.dag().num_ops();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();

        GateNormalization.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), before);
    }

    #[test]
    fn normalization_is_idempotent_on_canonical_circuits() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.rx(ParameterExpression::constant(0.3), QubitId(0)).unwrap();
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();

        GateNormalization.run(&mut dag, &mut props).unwrap();
        let once = dag.num_ops();
        GateNormalization.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), once);
    }

    #[test]
    fn unsupported_gate_reports_error() {
        let mut circuit = Circuit::with_size("test3", 3, 0);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();

        let result = GateNormalization.run(&mut dag, &mut props);
        assert!(matches!(result, Err(CompileError::UnsupportedGate(_))));
    }

    #[test]
    fn condition_and_metadata_survive_swap_expansion() {
        use qforge_ir::ClassicalCondition;

        let mut dag = qforge_ir::CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));
        dag.add_clbit(qforge_ir::ClbitId(0));
        let inst = Instruction::two_qubit_gate(StandardGate::Swap, QubitId(0), QubitId(1))
            .with_condition(ClassicalCondition::new("c", 1));
        dag.apply(inst).unwrap();

        let mut props = PropertySet::new();
        GateNormalization.run(&mut dag, &mut props).unwrap();

        for (_, inst) in dag.topological_ops() {
            assert_eq!(
                inst.condition,
                Some(ClassicalCondition::new("c", 1)),
                "condition must be preserved on every decomposition child"
            );
        }
    }

    #[derive(Debug, Clone)]
    enum GateOp {
        H(u32),
        X(u32),
        Y(u32),
        Z(u32),
        S(u32),
        T(u32),
        Rx(u32, f64),
        Ry(u32, f64),
        Rz(u32, f64),
        Cx(u32, u32),
        Cz(u32, u32),
        Swap(u32, u32),
        U(u32, f64, f64, f64),
    }

    impl GateOp {
        fn apply(self, circuit: &mut Circuit) {
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
                GateOp::Rx(q, theta) => {
                    let _ = circuit.rx(ParameterExpression::constant(theta), QubitId(q));
                }
                GateOp::Ry(q, theta) => {
                    let _ = circuit.ry(ParameterExpression::constant(theta), QubitId(q));
                }
                GateOp::Rz(q, theta) => {
                    let _ = circuit.rz(ParameterExpression::constant(theta), QubitId(q));
                }
                GateOp::Cx(c, t) => {
                    let _ = circuit.cx(QubitId(c), QubitId(t));
                }
                GateOp::Cz(c, t) => {
                    let _ = circuit.cz(QubitId(c), QubitId(t));
                }
                GateOp::Swap(a, b) => {
                    let _ = circuit.swap(QubitId(a), QubitId(b));
                }
                GateOp::U(q, theta, phi, lambda) => {
                    let _ = circuit.u(
                        ParameterExpression::constant(theta),
                        ParameterExpression::constant(phi),
                        ParameterExpression::constant(lambda),
                        QubitId(q),
                    );
                }
            }
        }
    }

    fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
        let angle = -10.0_f64..10.0;
        prop_oneof![
            (0..num_qubits).prop_map(GateOp::H),
            (0..num_qubits).prop_map(GateOp::X),
            (0..num_qubits).prop_map(GateOp::Y),
            (0..num_qubits).prop_map(GateOp::Z),
            (0..num_qubits).prop_map(GateOp::S),
            (0..num_qubits).prop_map(GateOp::T),
            (0..num_qubits, angle.clone()).prop_map(|(q, a)| GateOp::Rx(q, a)),
            (0..num_qubits, angle.clone()).prop_map(|(q, a)| GateOp::Ry(q, a)),
            (0..num_qubits, angle.clone()).prop_map(|(q, a)| GateOp::Rz(q, a)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("distinct qubits", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::Cx(c, t)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("distinct qubits", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::Cz(c, t)),
            (0..num_qubits, 0..num_qubits)
                .prop_filter("distinct qubits", |(a, b)| a != b)
                .prop_map(|(a, b)| GateOp::Swap(a, b)),
            (0..num_qubits, angle.clone(), angle.clone(), angle)
                .prop_map(|(q, th, ph, la)| GateOp::U(q, th, ph, la)),
        ]
    }

    fn arb_circuit() -> impl Strategy<Value = Circuit> {
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

    fn gate_names(dag: &qforge_ir::CircuitDag) -> Vec<String> {
        dag.topological_ops()
            .filter_map(|(_, inst)| inst.as_gate().map(|g| g.name().to_string()))
            .collect()
    }

    proptest! {
        /// Every operation left after normalisation belongs to the canonical
        /// gate set (universal invariant 1, first half).
        #[test]
        fn normalised_ops_are_all_canonical(circuit in arb_circuit()) {
            let mut dag = circuit.into_dag();
            let mut props = PropertySet::new();
            GateNormalization.run(&mut dag, &mut props).unwrap();

            for name in gate_names(&dag) {
                prop_assert!(is_canonical(&name), "non-canonical gate survived normalisation: {name}");
            }
        }

        /// Normalising twice is the same as normalising once (universal
        /// invariant 1, idempotence).
        #[test]
        fn normalisation_is_idempotent(circuit in arb_circuit()) {
            let mut dag = circuit.into_dag();
            let mut props = PropertySet::new();
            GateNormalization.run(&mut dag, &mut props).unwrap();
            let once = gate_names(&dag);

            GateNormalization.run(&mut dag, &mut props).unwrap();
            let twice = gate_names(&dag);

            prop_assert_eq!(once, twice);
        }
    }
}
