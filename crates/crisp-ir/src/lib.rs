//! Crisp Circuit Intermediate Representation
//!
//! Core data structures for circuits moving through the crisp pulse-efficient
//! pipeline: gates (including the native cross-resonance rotation `rzx` and the
//! opaque two-qubit `unitary`), instructions, the append-only [`CircuitDag`],
//! and the pulse calibrations attached to gate instances.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for built-in gates and [`CustomGate`] for
//!   matrix- or definition-backed operations
//! - **Parameters**: [`ParameterExpression`] for numeric or symbolic angles
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **DAG**: [`CircuitDag`] with per-gate-instance calibrations keyed by
//!   [`CalibrationKey`]
//! - **Circuit**: [`Circuit`] builder API
//! - **Documents**: [`CircuitDocument`] JSON exchange format
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use crisp_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Cross-Resonance Rotation
//!
//! ```rust
//! use crisp_ir::{Circuit, QubitId, ParameterExpression};
//! use std::f64::consts::PI;
//!
//! let mut circuit = Circuit::with_size("cr", 2, 0);
//! circuit.rzx(PI / 4.0, QubitId(0), QubitId(1)).unwrap();
//!
//! let theta = ParameterExpression::symbol("theta");
//! circuit.rzx(theta, QubitId(0), QubitId(1)).unwrap();
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H`, `X`, `Y`, `Z` | 1 | Hadamard and Pauli gates |
//! | `S`, `Sdg`, `T`, `Tdg` | 1 | Phase gates |
//! | `SX`, `SXdg` | 1 | sqrt(X) and its inverse |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | Rotation and phase gates |
//! | `U` | 1 | Universal single-qubit gate U(θ,φ,λ) |
//! | `CX`, `CY`, `CZ`, `CH` | 2 | Controlled gates |
//! | `Swap`, `ISwap` | 2 | Swap gates |
//! | `CRx`, `CRy`, `CRz`, `CP` | 2 | Controlled rotations |
//! | `RXX`, `RYY`, `RZZ` | 2 | Ising interactions |
//! | `RZX` | 2 | Cross-resonance ZX rotation |
//! | `CCX`, `CSwap` | 3 | Toffoli and Fredkin gates |

pub mod calibration;
pub mod circuit;
pub mod dag;
pub mod document;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use calibration::CalibrationKey;
pub use circuit::Circuit;
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, WireId};
pub use document::{CalibrationRecord, CircuitDocument, OperationRecord, ParamValue};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, CustomGate, Gate, GateKind, StandardGate, UNITARY_GATE_NAME};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{ClbitId, QubitId};
