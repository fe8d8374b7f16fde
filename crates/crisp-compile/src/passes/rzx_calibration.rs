//! Pulse schedules for cross-resonance gates.

use crisp_ir::{CalibrationKey, CircuitDag, StandardGate, UNITARY_GATE_NAME};
use crisp_pulse::cr::{rzx_schedule_echoed, rzx_schedule_no_echo};
use crisp_pulse::{InstructionMap, PulseResult, Schedule};
use tracing::debug;

use crate::config::{EchoMode, PipelineConfig, RZX_GATE_NAME};
use crate::error::{CompileError, CompileResult};

type ScheduleBuilder = fn(&InstructionMap, u32, u32, f64) -> PulseResult<Schedule>;

/// Attach a stretched CR schedule to every `rzx` instance.
///
/// [`EchoMode::Gate`] uses a single un-echoed segment per gate, since the
/// echo is already in the circuit; [`EchoMode::Pulse`] puts the echo in the
/// schedule. Instances that already have a calibration keep it.
pub fn rzx_calibrations(mut dag: CircuitDag, config: &PipelineConfig) -> CompileResult<CircuitDag> {
    let builder: ScheduleBuilder = match config.echo_mode() {
        EchoMode::Gate => rzx_schedule_no_echo,
        EchoMode::Pulse => rzx_schedule_echoed,
    };
    let map = config.instruction_map();
    let mut pending: Vec<(CalibrationKey, Schedule)> = Vec::new();

    for (_, inst) in dag.ops() {
        let qubits: Vec<u32> = inst.qubits.iter().map(|q| q.0).collect();
        if inst.name() == UNITARY_GATE_NAME {
            // Other widths are left for basis translation.
            let &[a, b] = qubits.as_slice() else {
                continue;
            };
            if map.has_calibration("cx", &[a, b]) || map.has_calibration("cx", &[b, a]) {
                continue;
            }
            return Err(CompileError::CalibrationUnavailable {
                gate: UNITARY_GATE_NAME.into(),
                qubits,
            });
        }
        let Some(StandardGate::RZX(theta)) = inst.as_standard() else {
            continue;
        };
        let theta = theta
            .as_f64()
            .ok_or_else(|| CompileError::UnboundParameter(format!("{RZX_GATE_NAME}({theta})")))?;
        let &[control, target] = qubits.as_slice() else {
            continue;
        };
        if !map.has_calibration("cx", &qubits) {
            return Err(CompileError::CalibrationUnavailable {
                gate: RZX_GATE_NAME.into(),
                qubits,
            });
        }

        let key = CalibrationKey::new(RZX_GATE_NAME, inst.qubits.clone(), &[theta]);
        if dag.calibrations().contains_key(&key) || pending.iter().any(|(k, _)| k == &key) {
            continue;
        }
        let schedule = builder(map, control, target, theta)?;
        debug!("Calibrated {} ({} dt)", key, schedule.duration());
        pending.push((key, schedule));
    }

    for (key, schedule) in pending {
        dag.add_calibration(key, schedule);
    }
    Ok(dag)
}
