//! Crisp Pulse Layer
//!
//! Pulse-level data for cross-resonance backends: output channels, parametric
//! waveforms, timed schedules and the [`InstructionMap`] that holds a backend's
//! native calibrations.
//!
//! The compiler uses this crate for one thing: turning every `rzx(theta)` it
//! emits into a concrete [`Schedule`] by stretching the backend's canonical CR
//! pulse (see [`cr`]).
//!
//! # Example
//!
//! ```rust
//! use crisp_pulse::{InstructionMap, cr};
//!
//! let map = InstructionMap::synthetic(2, &[(0, 1)]);
//! assert!(map.has_calibration("cx", &[0, 1]));
//!
//! let schedule = cr::rzx_schedule_no_echo(&map, 0, 1, 0.25).unwrap();
//! assert!(schedule.duration() > 0);
//! assert_eq!(schedule.duration() % map.granularity, 0);
//! ```

pub mod channel;
pub mod cr;
pub mod error;
pub mod instruction_map;
pub mod schedule;
pub mod waveform;

pub use channel::Channel;
pub use error::{PulseError, PulseResult};
pub use instruction_map::{CrossResonance, InstructionMap, QubitPulses};
pub use schedule::{PulseInstruction, Schedule, TimedInstruction};
pub use waveform::{Constant, Drag, GaussianSquare, Waveform};
