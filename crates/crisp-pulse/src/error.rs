//! Error types for the pulse crate.

use thiserror::Error;

/// Errors that can occur while building or looking up pulse schedules.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PulseError {
    /// The instruction map has no entry for the gate on these qubits.
    #[error("No calibration for '{gate}' on qubits {qubits:?}")]
    MissingCalibration {
        /// Gate name that was looked up.
        gate: String,
        /// Physical qubits of the lookup.
        qubits: Vec<u32>,
    },

    /// Gate has a different number of parameters than its calibration needs.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    ParameterCountMismatch {
        /// Name of the gate.
        gate: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters.
        got: usize,
    },

    /// Pulse shape parameters are out of range.
    #[error("Invalid pulse: {0}")]
    InvalidPulse(String),

    /// Instruction map document is malformed.
    #[error("Invalid instruction map: {0}")]
    InvalidMap(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Result type for pulse operations.
pub type PulseResult<T> = Result<T, PulseError>;
