//! Pass manager for orchestrating compilation, and the top-level
//! `transpile()` pipeline driver.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use qforge_ir::{Circuit, CircuitDag};

use crate::error::CompileResult;
use crate::metrics::{compute_metrics, CircuitMetrics};
use crate::pass::Pass;
use crate::passes::{
    BasisMapping, CalibrationAwareRouting, DynamicRouting, GateNormalization,
    MeasurementBarrierVerification, NaiveRouting, RouterStats, SabreRouting, TrivialLayout,
};
use crate::property::{BasisGates, CouplingMap, Layout, PropertySet};
use crate::topology::Topology;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                // Avoid calling dag.depth() here — it performs a full topological
                // sort (O(V+E)) on every pass and is only used for debug logging.
                debug!("Pass {} completed, ops: {}", pass.name(), dag.num_ops());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            dag.depth(),
            dag.num_ops()
        );

        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Which routing strategy a built pass manager should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Fixed embedding, SWAP-there-and-back.
    Naive,
    /// Identity initial embedding, layout drifts under SWAPs.
    Dynamic,
    /// Front-layer execution with lookahead SWAP scoring.
    Sabre,
    /// Like `Sabre`, but with a quality-driven initial embedding and
    /// error-penalized SWAP scoring.
    CalibrationAware,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Sabre
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    /// Which router to use when a coupling map is configured.
    algorithm: Algorithm,
    /// Target properties.
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            algorithm: Algorithm::default(),
            properties: PropertySet::new(),
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: No optimization, only required transformations
    /// - Level 1: Light optimization (default), adds verification
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set which routing algorithm to use.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the target properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();

        pm.add_pass(GateNormalization);

        if self.properties.basis_gates.is_some() {
            pm.add_pass(BasisMapping);
        }

        if self.properties.coupling_map.is_some() {
            match self.algorithm {
                Algorithm::CalibrationAware => {
                    pm.add_pass(CalibrationAwareRouting::default());
                }
                Algorithm::Naive => {
                    pm.add_pass(TrivialLayout);
                    pm.add_pass(NaiveRouting);
                }
                Algorithm::Dynamic => {
                    pm.add_pass(TrivialLayout);
                    pm.add_pass(DynamicRouting);
                }
                Algorithm::Sabre => {
                    pm.add_pass(TrivialLayout);
                    pm.add_pass(SabreRouting::default());
                }
            }

            // Routing may leave SWAP-expanded CX gates that are not
            // themselves native to the target; mop them up with a second
            // basis-mapping pass.
            if self.properties.basis_gates.is_some() {
                pm.add_pass(BasisMapping);
            }
        }

        if self.optimization_level >= 1 {
            pm.add_pass(MeasurementBarrierVerification);
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of running the full four-stage transpilation pipeline.
#[derive(Debug, Clone)]
pub struct TranspileResult {
    /// The fully transpiled, physical circuit.
    pub transpiled_circuit: Circuit,
    /// The final logical-to-physical embedding after routing.
    pub embedding: Layout,
    /// Depth, fidelity, and duration metrics for the transpiled circuit.
    pub metrics: CircuitMetrics,
    /// SWAP count and other routing statistics.
    pub router_stats: RouterStats,
    /// OpenQASM 2.0 rendering of the transpiled circuit.
    pub transpiled_qasm2: String,
    /// OpenQASM 2.0 rendering of the circuit after gate normalization only,
    /// before basis mapping and routing.
    pub normalized_qasm2: String,
}

/// Run the full gate-normalization → basis-mapping → routing → metrics
/// pipeline against a target topology.
pub fn transpile(circuit: Circuit, topology: &Topology, algorithm: Algorithm) -> CompileResult<TranspileResult> {
    let original_dag = circuit.into_dag();

    let mut normalized_dag = original_dag.clone();
    GateNormalization.run(&mut normalized_dag, &mut PropertySet::new())?;
    let normalized_qasm2 = qforge_qasm::emit_qasm2(&Circuit::from_dag(normalized_dag))?;

    let mut properties = PropertySet::new().with_target(topology.coupling_map.clone(), topology.basis_gates.clone());
    if let Some(calibration) = topology.calibration.clone() {
        properties = properties.with_calibration(calibration);
    }

    let (pass_manager, mut properties) = PassManagerBuilder::new()
        .with_algorithm(algorithm)
        .with_properties(properties)
        .build();

    let mut dag = original_dag.clone();
    pass_manager.run(&mut dag, &mut properties)?;

    let embedding = properties.layout.clone().unwrap_or_default();
    let router_stats = properties.get::<RouterStats>().cloned().unwrap_or_default();

    let transpiled_circuit = Circuit::from_dag(dag.clone());
    let transpiled_qasm2 = qforge_qasm::emit_qasm2(&transpiled_circuit)?;

    let metrics = compute_metrics(&original_dag, &dag, &embedding, topology, router_stats.n_swap_gates);

    Ok(TranspileResult {
        transpiled_circuit,
        embedding,
        metrics,
        router_stats,
        transpiled_qasm2,
        normalized_qasm2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BasisGates as BG, CouplingMap as CM};
    use qforge_ir::QubitId;

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();

        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let mut dag = circuit.into_dag();
        pm.run(&mut dag, &mut props).unwrap();

        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_pass_manager_builder() {
        let (pm, props) = PassManagerBuilder::new()
            .with_algorithm(Algorithm::Naive)
            .with_target(CM::linear(5), BG::iqm())
            .build();

        assert!(!pm.is_empty());
        assert!(props.coupling_map.is_some());
        assert!(props.basis_gates.is_some());
    }

    #[test]
    fn transpile_bell_state_on_identity_topology() {
        let mut circuit = Circuit::with_size("bell", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let topology = Topology::new("identity-2", CM::linear(2), BG::universal());
        let result = transpile(circuit, &topology, Algorithm::Sabre).unwrap();

        assert_eq!(result.router_stats.n_swap_gates, 0);
        assert!(result.transpiled_qasm2.contains("OPENQASM 2.0"));
        assert!(result.normalized_qasm2.contains("OPENQASM 2.0"));
        assert!(result.metrics.gate_fidelity >= 0.0 && result.metrics.gate_fidelity <= 1.0);
    }

    #[test]
    fn transpile_non_adjacent_cx_needs_two_swaps() {
        let mut circuit = Circuit::with_size("chain", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let topology = Topology::new("linear-3", CM::linear(3), BG::universal());
        let result = transpile(circuit, &topology, Algorithm::Naive).unwrap();

        assert_eq!(result.router_stats.n_swap_gates, 2);
        for (_, inst) in result.transpiled_circuit.dag().topological_ops() {
            if inst.is_gate() && inst.qubits.len() == 2 {
                let (p0, p1) = (inst.qubits[0].0, inst.qubits[1].0);
                assert!(topology.coupling_map.is_connected(p0, p1));
            }
        }
    }

    #[test]
    fn transpile_depth_never_decreases() {
        let mut circuit = Circuit::with_size("ghz", 4, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(2)).unwrap();
        circuit.cx(QubitId(2), QubitId(3)).unwrap();

        let topology = Topology::new("linear-4", CM::linear(4), BG::universal());
        let result = transpile(circuit, &topology, Algorithm::Sabre).unwrap();

        assert!(result.metrics.transpiled_depth >= result.metrics.original_depth);
    }
}
