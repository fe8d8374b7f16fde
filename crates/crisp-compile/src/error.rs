//! Error types for the compilation crate.

use crisp_ir::QubitId;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] crisp_ir::IrError),

    /// Error from the pulse crate.
    #[error("Pulse error: {0}")]
    Pulse(#[from] crisp_pulse::PulseError),

    /// A block could not be reduced to a single unitary.
    #[error("Cannot consolidate block on ({}, {}): {reason}", .qubits[0], .qubits[1])]
    Consolidation {
        /// The block's qubit pair.
        qubits: [QubitId; 2],
        /// Why the block was left as is.
        reason: String,
    },

    /// No pulse data exists for a gate instance.
    #[error("No calibration available for '{gate}' on {qubits:?}")]
    CalibrationUnavailable {
        /// Gate name.
        gate: String,
        /// Qubits of the instance.
        qubits: Vec<u32>,
    },

    /// A gate has no rewrite path into the target basis.
    #[error("Gate '{gate}' cannot be translated into basis [{basis}]")]
    BasisTranslation {
        /// Gate name.
        gate: String,
        /// The target basis, comma separated.
        basis: String,
    },

    /// A numerical reconstruction did not match its input.
    #[error("Stage '{stage}' deviated by {deviation:e} (tolerance {tolerance:e})")]
    NumericalToleranceExceeded {
        /// Stage that detected the mismatch.
        stage: String,
        /// Measured deviation.
        deviation: f64,
        /// Allowed deviation.
        tolerance: f64,
    },

    /// A two-qubit operation acts on a pair the coupling map does not connect.
    #[error("Qubits {q0} and {q1} are not connected in the coupling map")]
    DisconnectedQubits {
        /// First operand.
        q0: u32,
        /// Second operand.
        q1: u32,
    },

    /// A numeric angle was required but the parameter is symbolic.
    #[error("Unbound parameter in '{0}'")]
    UnboundParameter(String),

    /// The operation has no unitary matrix.
    #[error("Operation '{0}' has no unitary matrix")]
    NonUnitary(String),

    /// The circuit is too wide for dense simulation.
    #[error("Cannot simulate {num_qubits} qubits densely (limit {max})")]
    TooLargeToSimulate {
        /// Qubits in the circuit.
        num_qubits: usize,
        /// Largest supported width.
        max: usize,
    },

    /// Invalid pipeline configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
