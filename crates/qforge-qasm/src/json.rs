//! JSON interchange format for circuits.
//!
//! A `serde`-derived document shape for serializing a [`Circuit`] to the
//! same dict layout a `POST /transpile/run` response would carry: `{type,
//! qubits, clbits, params, metadata, condition?, body?|if_body?|else_body?|
//! iterations?}` per operation. Parsing this format back into a `Circuit` is
//! out of scope — only emission is implemented.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use qforge_ir::{Circuit, GateKind, Instruction, InstructionKind, ParameterExpression};

use crate::error::{ParseError, ParseResult};

/// A circuit rendered as a JSON-serializable document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitDoc {
    pub num_qubits: usize,
    pub num_clbits: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    pub operations: Vec<OperationDoc>,
}

/// One instruction in the JSON interchange format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDoc {
    #[serde(rename = "type")]
    pub op_type: String,
    pub qubits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<OperationDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_body: Option<Vec<OperationDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_body: Option<Vec<OperationDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
}

/// A classical condition gating an operation or a loop body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDoc {
    pub register: String,
    pub value: u64,
}

/// Render a circuit as the JSON interchange document, pretty-printed.
pub fn emit_json(circuit: &Circuit) -> ParseResult<String> {
    serde_json::to_string_pretty(&circuit_to_doc(circuit)).map_err(|e| ParseError::Generic(e.to_string()))
}

/// Convert a circuit into its JSON-serializable document form.
pub fn circuit_to_doc(circuit: &Circuit) -> CircuitDoc {
    let operations = circuit
        .dag()
        .topological_ops()
        .map(|(_, inst)| instruction_to_doc(inst))
        .collect();

    CircuitDoc {
        num_qubits: circuit.num_qubits(),
        num_clbits: circuit.num_clbits(),
        metadata: BTreeMap::new(),
        operations,
    }
}

fn instruction_to_doc(inst: &Instruction) -> OperationDoc {
    let mut doc = OperationDoc {
        op_type: inst.name().to_string(),
        qubits: inst.qubits.iter().map(|q| q.0).collect(),
        clbits: inst.clbits.iter().map(|c| c.0).collect(),
        params: Vec::new(),
        metadata: inst.metadata.clone(),
        condition: inst.condition.as_ref().map(condition_to_doc),
        body: None,
        if_body: None,
        else_body: None,
        iterations: None,
    };

    match &inst.kind {
        InstructionKind::Gate(gate) => {
            doc.params = gate_params(&gate.kind);
        }
        InstructionKind::ForLoop { iterations, body } => {
            doc.iterations = Some(*iterations);
            doc.body = Some(body.iter().map(instruction_to_doc).collect());
        }
        InstructionKind::WhileLoop { condition, body } => {
            doc.condition = Some(ConditionDoc {
                register: condition.register.clone(),
                value: condition.value,
            });
            doc.body = Some(body.iter().map(instruction_to_doc).collect());
        }
        InstructionKind::IfElse { condition, if_body, else_body } => {
            doc.condition = Some(ConditionDoc {
                register: condition.register.clone(),
                value: condition.value,
            });
            doc.if_body = Some(if_body.iter().map(instruction_to_doc).collect());
            doc.else_body = Some(else_body.iter().map(instruction_to_doc).collect());
        }
        _ => {}
    }

    doc
}

fn condition_to_doc(condition: &qforge_ir::ClassicalCondition) -> ConditionDoc {
    ConditionDoc {
        register: condition.register.clone(),
        value: condition.value,
    }
}

fn gate_params(kind: &GateKind) -> Vec<f64> {
    match kind {
        GateKind::Standard(std) => std.parameters().iter().filter_map(|p| p.as_f64()).collect(),
        GateKind::Custom(custom) => custom.params.iter().filter_map(ParameterExpression::as_f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_ir::QubitId;

    #[test]
    fn bell_circuit_round_trips_through_serde() {
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let doc = circuit_to_doc(&circuit);
        assert_eq!(doc.num_qubits, 2);
        assert_eq!(doc.num_clbits, 2);
        assert_eq!(doc.operations.len(), 2);
        assert_eq!(doc.operations[0].op_type, "h");
        assert_eq!(doc.operations[1].op_type, "cx");
        assert_eq!(doc.operations[1].qubits, vec![0, 1]);

        let json = emit_json(&circuit).unwrap();
        let parsed: CircuitDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operations.len(), doc.operations.len());
    }

    #[test]
    fn parameterized_gate_carries_its_angle() {
        let mut circuit = Circuit::with_size("rz", 1, 0);
        circuit.rz(std::f64::consts::FRAC_PI_2, QubitId(0)).unwrap();

        let doc = circuit_to_doc(&circuit);
        assert_eq!(doc.operations[0].op_type, "rz");
        assert_eq!(doc.operations[0].params.len(), 1);
        assert!((doc.operations[0].params[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-10);
    }

    #[test]
    fn for_loop_body_is_nested() {
        use qforge_ir::Instruction;

        let mut circuit = Circuit::with_size("loop", 1, 0);
        let body = vec![Instruction::single_qubit_gate(
            qforge_ir::StandardGate::H,
            QubitId(0),
        )];
        circuit
            .dag_mut()
            .apply(Instruction::for_loop(3, body, [QubitId(0)], []))
            .unwrap();

        let doc = circuit_to_doc(&circuit);
        let loop_doc = &doc.operations[0];
        assert_eq!(loop_doc.op_type, "for_loop");
        assert_eq!(loop_doc.iterations, Some(3));
        assert_eq!(loop_doc.body.as_ref().unwrap().len(), 1);
    }
}
