//! Shared helpers used by every routing pass: SWAP emission and a
//! per-invocation statistics record.

use std::collections::BTreeSet;

use qforge_ir::{Instruction, InstructionKind, QubitId, StandardGate};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::property::{BasisGates, CouplingMap, Layout};

/// Diagnostics returned alongside a routed circuit and its final embedding.
///
/// Mirrors the ad hoc metrics a router accumulates while it works: how many
/// SWAPs it committed, how many outer iterations it took, which physical
/// qubits ended up touched (including ancillas only visited by a SWAP
/// chain), and any non-fatal warnings (e.g. missing calibration data).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouterStats {
    /// Number of logical SWAP operations committed (each may expand into
    /// three CX/CZ gates in the emitted circuit).
    pub n_swap_gates: usize,
    /// Outer loop iterations consumed. Always 1 for the naive and dynamic
    /// routers, which route in a single linear pass.
    pub iterations: usize,
    /// Physical qubits touched by the routed circuit, including ancillas
    /// only visited as SWAP-chain waypoints.
    pub physical_qubits_used: BTreeSet<u32>,
    /// Non-fatal warnings, e.g. calibration data missing for a qubit or
    /// gate consulted during routing.
    pub warnings: Vec<String>,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_qubit(&mut self, physical: u32) {
        self.physical_qubits_used.insert(physical);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Emit one logical SWAP between two physical qubits.
///
/// If `swap` is native to the target, emits a single `swap` gate;
/// otherwise expands it in place into the canonical three-CX identity (a
/// router must never leave a raw `swap` op in a circuit whose target
/// doesn't support it).
pub(crate) fn emit_swap(basis_gates: &BasisGates, p0: u32, p1: u32) -> Vec<Instruction> {
    if basis_gates.contains("swap") {
        vec![Instruction::two_qubit_gate(
            StandardGate::Swap,
            QubitId(p0),
            QubitId(p1),
        )]
    } else {
        vec![
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(p0), QubitId(p1)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(p1), QubitId(p0)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(p0), QubitId(p1)),
        ]
    }
}

/// Remap every qubit operand of `inst` from logical to physical using the
/// current layout, leaving everything else (clbits, condition, metadata)
/// untouched.
pub(crate) fn remap_instruction(inst: &Instruction, layout: &Layout) -> CompileResult<Instruction> {
    let mut out = inst.clone();
    out.qubits = remap_qubits(&inst.qubits, layout)?;
    Ok(out)
}

pub(crate) fn remap_qubits(qubits: &[QubitId], layout: &Layout) -> CompileResult<Vec<QubitId>> {
    qubits
        .iter()
        .map(|&q| {
            layout
                .get_physical(q)
                .map(QubitId)
                .ok_or(CompileError::MissingLayout)
        })
        .collect()
}

/// Route a flat, already-physical-qubit-agnostic instruction stream in
/// strict topological order, inserting SWAP chains in front of any
/// two-qubit gate whose logical operands aren't adjacent under the
/// current layout.
///
/// Shared by the naive and dynamic routers, which differ only in whether
/// the perturbation a SWAP chain makes to reach a gate is
/// undone (`unwind = true`, naive) or kept (`unwind = false`, dynamic).
/// Control-flow bodies are routed recursively against the same layout.
pub(crate) fn route_flat(
    ops: &[Instruction],
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    basis_gates: &BasisGates,
    stats: &mut RouterStats,
    unwind: bool,
) -> CompileResult<Vec<Instruction>> {
    let mut out = Vec::with_capacity(ops.len());

    for inst in ops {
        if inst.is_control_flow() {
            out.push(route_control_flow(
                inst,
                layout,
                coupling_map,
                basis_gates,
                stats,
                unwind,
            )?);
            continue;
        }

        if inst.is_gate() && inst.qubits.len() == 2 {
            let (q0, q1) = (inst.qubits[0], inst.qubits[1]);
            let p0 = layout.get_physical(q0).ok_or(CompileError::MissingLayout)?;
            let p1 = layout.get_physical(q1).ok_or(CompileError::MissingLayout)?;

            if !coupling_map.is_connected(p0, p1) {
                let path = coupling_map
                    .shortest_path(p0, p1)
                    .ok_or(CompileError::RoutingFailed {
                        qubit1: p0,
                        qubit2: p1,
                    })?;

                let mut forward_swaps = Vec::new();
                for i in 0..path.len().saturating_sub(2) {
                    let (sp0, sp1) = (path[i], path[i + 1]);
                    out.extend(emit_swap(basis_gates, sp0, sp1));
                    layout.swap(sp0, sp1);
                    stats.record_qubit(sp0);
                    stats.record_qubit(sp1);
                    stats.n_swap_gates += 1;
                    forward_swaps.push((sp0, sp1));
                }

                out.push(remap_instruction(inst, layout)?);

                if unwind {
                    for &(sp0, sp1) in forward_swaps.iter().rev() {
                        out.extend(emit_swap(basis_gates, sp0, sp1));
                        layout.swap(sp0, sp1);
                        stats.n_swap_gates += 1;
                    }
                }
                continue;
            }
        }

        out.push(remap_instruction(inst, layout)?);
        for &q in &inst.qubits {
            if let Some(p) = layout.get_physical(q) {
                stats.record_qubit(p);
            }
        }
    }

    Ok(out)
}

fn route_control_flow(
    inst: &Instruction,
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    basis_gates: &BasisGates,
    stats: &mut RouterStats,
    unwind: bool,
) -> CompileResult<Instruction> {
    let mut out = inst.clone();
    match &mut out.kind {
        InstructionKind::ForLoop { body, .. } | InstructionKind::WhileLoop { body, .. } => {
            *body = route_flat(body, layout, coupling_map, basis_gates, stats, unwind)?;
        }
        InstructionKind::IfElse {
            if_body, else_body, ..
        } => {
            *if_body = route_flat(if_body, layout, coupling_map, basis_gates, stats, unwind)?;
            *else_body = route_flat(else_body, layout, coupling_map, basis_gates, stats, unwind)?;
        }
        _ => {}
    }
    out.qubits = remap_qubits(&inst.qubits, layout)?;
    Ok(out)
}
