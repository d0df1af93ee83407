//! Dependency layering shared by the front-layer routers (SABRE-style and
//! calibration-aware).
//!
//! The predecessor of an operation on a given wire is the last prior
//! operation touching that wire. The front layer at any point is the set
//! of not-yet-executed operations all of whose predecessors have executed.

use rustc_hash::FxHashMap;

use qforge_ir::Instruction;

/// Compute, for each operation in `ops`, the indices of its immediate
/// predecessors (the last previous operation on each qubit or classical
/// bit it touches).
pub(crate) fn build_predecessors(ops: &[Instruction]) -> Vec<Vec<usize>> {
    let mut preds = vec![Vec::new(); ops.len()];
    let mut last_qubit: FxHashMap<u32, usize> = FxHashMap::default();
    let mut last_clbit: FxHashMap<u32, usize> = FxHashMap::default();

    for (i, inst) in ops.iter().enumerate() {
        let mut dep_set: Vec<usize> = Vec::new();
        for q in &inst.qubits {
            if let Some(&p) = last_qubit.get(&q.0) {
                if !dep_set.contains(&p) {
                    dep_set.push(p);
                }
            }
        }
        for c in &inst.clbits {
            if let Some(&p) = last_clbit.get(&c.0) {
                if !dep_set.contains(&p) {
                    dep_set.push(p);
                }
            }
        }
        dep_set.sort_unstable();
        preds[i] = dep_set;

        for q in &inst.qubits {
            last_qubit.insert(q.0, i);
        }
        for c in &inst.clbits {
            last_clbit.insert(c.0, i);
        }
    }

    preds
}

/// The set of operation indices that are unexecuted but whose predecessors
/// have all executed.
pub(crate) fn front_layer(executed: &[bool], preds: &[Vec<usize>]) -> Vec<usize> {
    (0..executed.len())
        .filter(|&i| !executed[i] && preds[i].iter().all(|&p| executed[p]))
        .collect()
}
