//! Backend pulse data: native single-qubit pulses and cross-resonance tones.
//!
//! An [`InstructionMap`] is the read-only source of every calibration the
//! compiler can produce. It is usually loaded from the backend's YAML or JSON
//! description:
//!
//! ```yaml
//! dt: 2.2222e-10
//! granularity: 16
//! qubits:
//!   - qubit: 0
//!     x:  { duration: 160, amp: 0.2, sigma: 40.0, beta: 1.0 }
//!     sx: { duration: 160, amp: 0.1, sigma: 40.0, beta: 1.0 }
//! cross_resonance:
//!   - control: 0
//!     target: 1
//!     control_channel: 0
//!     cr_pulse: { duration: 688, amp: 0.3, sigma: 64.0, width: 432.0 }
//!     rotary:   { duration: 688, amp: 0.05, sigma: 64.0, width: 432.0 }
//! ```

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::{PulseError, PulseResult};
use crate::schedule::Schedule;
use crate::waveform::{Drag, GaussianSquare, Waveform};

fn default_granularity() -> u64 {
    16
}

/// Native pulses for one qubit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QubitPulses {
    /// Physical qubit index.
    pub qubit: u32,
    /// Pi pulse.
    pub x: Drag,
    /// Pi/2 pulse.
    pub sx: Drag,
}

/// Cross-resonance pulse data for a directed qubit pair.
///
/// `cr_pulse` is one half of the echoed CX: played once with positive and once
/// with negative amplitude around an X on the control, it implements a
/// `ZX(pi/2)` interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossResonance {
    /// Control qubit.
    pub control: u32,
    /// Target qubit.
    pub target: u32,
    /// Index of the control channel that drives this pair.
    pub control_channel: u32,
    /// Positive half of the echoed CR tone.
    pub cr_pulse: GaussianSquare,
    /// Compensation tone played on the target drive alongside the CR tone.
    #[serde(default)]
    pub rotary: Option<GaussianSquare>,
}

/// Read-only store of native pulse data for a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionMap {
    /// Sample time in seconds.
    pub dt: f64,
    /// Pulse durations must be multiples of this many samples.
    #[serde(default = "default_granularity")]
    pub granularity: u64,
    /// Per-qubit native pulses.
    #[serde(default)]
    pub qubits: Vec<QubitPulses>,
    /// Per-pair cross-resonance data.
    #[serde(default)]
    pub cross_resonance: Vec<CrossResonance>,
}

impl Default for InstructionMap {
    fn default() -> Self {
        Self {
            dt: 2.0e-9 / 9.0,
            granularity: default_granularity(),
            qubits: Vec::new(),
            cross_resonance: Vec::new(),
        }
    }
}

impl InstructionMap {
    /// Parse an instruction map from YAML.
    pub fn from_yaml(source: &str) -> PulseResult<Self> {
        let map: Self = serde_yaml_ng::from_str(source)?;
        map.validate()?;
        Ok(map)
    }

    /// Parse an instruction map from JSON.
    pub fn from_json(source: &str) -> PulseResult<Self> {
        let map: Self = serde_json::from_str(source)?;
        map.validate()?;
        Ok(map)
    }

    /// Synthetic pulse data for `num_qubits` qubits and the given directed
    /// CR pairs. Each pair gets its own control channel in list order.
    pub fn synthetic(num_qubits: u32, pairs: &[(u32, u32)]) -> Self {
        let drag = |amp: f64| Drag {
            duration: 160,
            amp,
            angle: 0.0,
            sigma: 40.0,
            beta: 1.0,
        };
        let square = |amp: f64| GaussianSquare {
            duration: 688,
            amp,
            angle: 0.0,
            sigma: 64.0,
            width: 432.0,
        };
        let qubits = (0..num_qubits)
            .map(|qubit| QubitPulses {
                qubit,
                x: drag(0.2),
                sx: drag(0.1),
            })
            .collect();
        let cross_resonance = pairs
            .iter()
            .zip(0u32..)
            .map(|(&(control, target), channel)| CrossResonance {
                control,
                target,
                control_channel: channel,
                cr_pulse: square(0.3),
                rotary: Some(square(0.05)),
            })
            .collect();
        Self {
            qubits,
            cross_resonance,
            ..Self::default()
        }
    }

    /// Check every pulse and the uniqueness of entries.
    pub fn validate(&self) -> PulseResult<()> {
        if self.granularity == 0 {
            return Err(PulseError::InvalidMap("granularity must be positive".into()));
        }
        for (i, q) in self.qubits.iter().enumerate() {
            if self.qubits[..i].iter().any(|p| p.qubit == q.qubit) {
                return Err(PulseError::InvalidMap(format!(
                    "duplicate pulses for qubit {}",
                    q.qubit
                )));
            }
        }
        for (i, cr) in self.cross_resonance.iter().enumerate() {
            if cr.control == cr.target {
                return Err(PulseError::InvalidMap(format!(
                    "cross-resonance pair ({}, {}) uses one qubit twice",
                    cr.control, cr.target
                )));
            }
            if self.cross_resonance[..i]
                .iter()
                .any(|p| p.control == cr.control && p.target == cr.target)
            {
                return Err(PulseError::InvalidMap(format!(
                    "duplicate cross-resonance pair ({}, {})",
                    cr.control, cr.target
                )));
            }
            cr.cr_pulse.validate()?;
            if let Some(rotary) = &cr.rotary {
                rotary.validate()?;
            }
        }
        Ok(())
    }

    /// Native pulses of a qubit.
    pub fn qubit(&self, qubit: u32) -> Option<&QubitPulses> {
        self.qubits.iter().find(|q| q.qubit == qubit)
    }

    /// Cross-resonance data for the directed pair `(control, target)`.
    pub fn cross_resonance(&self, control: u32, target: u32) -> Option<&CrossResonance> {
        self.cross_resonance
            .iter()
            .find(|cr| cr.control == control && cr.target == target)
    }

    /// Whether a native schedule exists for `name` on `qubits`.
    ///
    /// Native schedules are `x` and `sx` on one qubit and `cx` on a directed
    /// pair; `cx` is only native in the direction of the CR data.
    pub fn has_calibration(&self, name: &str, qubits: &[u32]) -> bool {
        match (name, qubits) {
            ("x" | "sx", &[q]) => self.qubit(q).is_some(),
            ("cx", &[c, t]) => self.cross_resonance(c, t).is_some() && self.qubit(c).is_some(),
            _ => false,
        }
    }

    /// Build the native schedule for `name` on `qubits`.
    pub fn get_calibration(&self, name: &str, qubits: &[u32], params: &[f64]) -> PulseResult<Schedule> {
        if !params.is_empty() {
            return Err(PulseError::ParameterCountMismatch {
                gate: name.to_string(),
                expected: 0,
                got: params.len(),
            });
        }
        let missing = || PulseError::MissingCalibration {
            gate: name.to_string(),
            qubits: qubits.to_vec(),
        };
        match (name, qubits) {
            ("x", &[q]) => {
                let pulses = self.qubit(q).ok_or_else(missing)?;
                Ok(single_qubit_schedule("x", q, pulses.x))
            }
            ("sx", &[q]) => {
                let pulses = self.qubit(q).ok_or_else(missing)?;
                Ok(single_qubit_schedule("sx", q, pulses.sx))
            }
            ("cx", &[c, t]) => {
                let cr = self.cross_resonance(c, t).ok_or_else(missing)?;
                let x = self.qubit(c).ok_or_else(missing)?;
                Ok(echoed_cx_schedule(cr, x.x))
            }
            _ => Err(missing()),
        }
    }
}

fn single_qubit_schedule(name: &str, qubit: u32, pulse: Drag) -> Schedule {
    let mut schedule = Schedule::new(name);
    schedule.play(Channel::Drive(qubit), Waveform::Drag(pulse));
    schedule
}

/// `CR(+) X(c) CR(-) X(c)` with the compensation tone mirrored on the target.
fn echoed_cx_schedule(cr: &CrossResonance, x: Drag) -> Schedule {
    let half = |sign: f64| {
        let mut s = Schedule::new("cr");
        let mut pulse = cr.cr_pulse;
        pulse.amp *= sign;
        s.play(Channel::Control(cr.control_channel), Waveform::GaussianSquare(pulse));
        if let Some(mut rotary) = cr.rotary {
            rotary.amp *= sign;
            s.play(Channel::Drive(cr.target), Waveform::GaussianSquare(rotary));
        }
        s
    };
    let echo = single_qubit_schedule("x", cr.control, x);

    let mut schedule = Schedule::new("cx");
    schedule
        .append_sequential(&half(1.0))
        .append_sequential(&echo)
        .append_sequential(&half(-1.0))
        .append_sequential(&echo);
    schedule
}
