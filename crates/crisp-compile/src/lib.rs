//! Crisp pulse-efficient transpiler
//!
//! This crate rewrites quantum circuits for backends whose native entangler
//! is a cross-resonance rotation `rzx` with explicit pulse schedules. Instead
//! of lowering every two-qubit interaction to CNOTs, it merges two-qubit
//! regions into single unitaries and realizes each one with as little CR
//! pulse area as its Weyl coordinates require.
//!
//! # Overview
//!
//! The pipeline runs five stages in a fixed order:
//! 1. **Block collection and consolidation**: merge runs of gates on one
//!    qubit pair into a single `unitary` gate
//! 2. **Weyl decomposition**: express each unitary as local gates plus echoed
//!    `rzx` rotations in the pair's native CR direction
//! 3. **RZX calibration**: attach a stretched CR pulse schedule to every
//!    `rzx` instance
//! 4. **Unrolling and basis translation**: expand custom definitions and
//!    rewrite everything else into the basis plus `rzx`
//! 5. **1q re-optimization**: collapse single-qubit runs into Euler sequences
//!
//! # Architecture
//!
//! ```text
//! Input Circuit
//!       |
//!       v
//! +----------+
//! | Pipeline | <-- PipelineConfig (basis gates, instruction map, tolerances)
//! +----------+
//!       |
//!       |-- collect_2q_blocks + consolidate_blocks
//!       |-- echo_rzx_weyl_decomposition
//!       |-- rzx_calibrations
//!       |-- unroll_custom_definitions
//!       |-- basis_translation
//!       |-- optimize_1q_decomposition
//!       |
//!       v
//! Output Circuit (basis + calibrated rzx)
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use crisp_compile::{BasisGates, Pipeline, PipelineConfig};
//! use crisp_ir::{Circuit, QubitId};
//! use crisp_pulse::InstructionMap;
//!
//! let mut circuit = Circuit::with_size("cx", 2, 0);
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let map = InstructionMap::synthetic(2, &[(0, 1)]);
//! let config = PipelineConfig::new(BasisGates::ibm_cr(), Arc::new(map));
//! let (dag, report) = Pipeline::pulse_efficient(config)
//!     .run(circuit.into_dag())
//!     .unwrap();
//!
//! assert_eq!(report.cr_gates, 2);
//! assert!(dag.ops().all(|(_, inst)| ["rz", "sx", "x", "rzx"].contains(&inst.name())));
//! ```

pub mod config;
pub mod equivalence;
pub mod error;
pub mod euler;
pub mod passes;
pub mod pipeline;
pub mod simulate;
pub mod unitary;
pub mod weyl;

pub use config::{BackendConfig, BasisGates, CouplingMap, EchoMode, PipelineConfig};
pub use equivalence::EquivalenceLibrary;
pub use error::{CompileError, CompileResult};
pub use euler::EulerBasis;
pub use pipeline::{Pipeline, PipelineReport, StageFn, StageReport};
pub use weyl::{WeylCoordinates, WeylDecomposition};
