//! Error types for the compilation pipeline.

use qforge_ir::IrError;

/// Errors produced while compiling or transpiling a circuit.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A pass that requires basis gates ran without any configured.
    #[error("no basis gates configured for this pass")]
    MissingBasisGates,

    /// A gate could not be expressed in the configured basis gate set.
    #[error("gate not in basis: {0}")]
    GateNotInBasis(String),

    /// A gate has no decomposition rule into the requested target basis.
    #[error("no decomposition for gate '{gate}' into basis '{target_basis}'")]
    UnsupportedDecomposition {
        gate: String,
        target_basis: String,
    },

    /// An operation uses a gate the normaliser does not recognise.
    #[error("unsupported gate: {0}")]
    UnsupportedGate(String),

    /// A pass that requires a coupling map ran without one configured.
    #[error("no coupling map configured for this pass")]
    MissingCouplingMap,

    /// A pass that requires a layout ran before one was computed.
    #[error("no layout computed for this pass")]
    MissingLayout,

    /// No route exists between two physical qubits under the configured topology.
    #[error("no route found between physical qubits {qubit1} and {qubit2}")]
    RoutingFailed { qubit1: u32, qubit2: u32 },

    /// The circuit requires more physical qubits than the topology provides.
    #[error("circuit requires {required} qubits but only {available} are available")]
    CircuitTooLarge { required: usize, available: u32 },

    /// The circuit's connectivity needs differ from what the topology can satisfy.
    #[error("topology mismatch: circuit requires {required}, topology provides {available}")]
    TopologyMismatch { required: String, available: String },

    /// A router exceeded its per-gate SWAP budget while unblocking an operation.
    #[error("SWAP budget of {budget} exceeded routing operation at index {gate_index}")]
    SwapBudgetExceeded { gate_index: usize, budget: usize },

    /// A router's outer iteration cap was reached before the circuit finished routing.
    #[error("routing iteration cap exceeded")]
    IterationCapExceeded,

    /// A pass produced a circuit that violates a documented structural invariant.
    #[error("invariant violated at op {op_index}: {detail}")]
    InvariantViolated { detail: String, op_index: usize },

    /// A measurement/barrier ordering violation was detected after transformation.
    #[error("measurement ordering violated by '{gate_name}' on qubit {qubit}: {detail}")]
    MeasurementViolation {
        gate_name: String,
        qubit: u32,
        detail: String,
    },

    /// An error propagated up from the circuit IR layer.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// QASM emission of a pipeline stage's circuit failed.
    #[error("QASM emission failed: {0}")]
    QasmEmission(#[from] qforge_qasm::ParseError),
}

/// Convenience alias for results produced by the compilation pipeline.
pub type CompileResult<T> = Result<T, CompileError>;
