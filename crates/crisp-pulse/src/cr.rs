//! Cross-resonance pulse stretching and `rzx` schedule builders.
//!
//! The canonical CR half pulse of a pair implements `RZX(pi/4)`. A schedule for
//! an arbitrary angle is obtained by scaling the pulse area linearly in the
//! angle: first by shortening or lengthening the flat top, and once the flat
//! top is gone by reducing the amplitude of the remaining Gaussian flanks.

use std::f64::consts::FRAC_PI_2;

use crate::channel::Channel;
use crate::error::{PulseError, PulseResult};
use crate::instruction_map::{CrossResonance, InstructionMap};
use crate::schedule::Schedule;
use crate::waveform::{GaussianSquare, Waveform};

/// Angles below this magnitude produce an empty schedule.
const ZERO_ANGLE: f64 = 1e-12;

/// Round up to a multiple of `granularity`, ignoring float noise just above
/// an exact multiple.
fn round_up(value: f64, granularity: u64) -> u64 {
    let g = granularity as f64;
    ((value / g - 1e-9).ceil().max(0.0) * g) as u64
}

/// Stretch `pulse` so that its area is `|theta| / (pi/2)` times the original.
///
/// The sign of `theta` is carried by the amplitude. Durations are rounded up
/// to `granularity` samples.
pub fn rescale_cr_pulse(
    pulse: &GaussianSquare,
    theta: f64,
    granularity: u64,
) -> PulseResult<GaussianSquare> {
    pulse.validate()?;
    if granularity == 0 {
        return Err(PulseError::InvalidPulse("granularity must be positive".into()));
    }
    if pulse.amp == 0.0 {
        return Err(PulseError::InvalidPulse(
            "cannot rescale a zero-amplitude cross-resonance pulse".into(),
        ));
    }

    let n_sigmas = pulse.risefall_sigmas();
    let gaussian_area = pulse.gaussian_area();
    let target_area = theta.abs() / FRAC_PI_2 * pulse.area();
    let sign = theta.signum();

    let scaled = if target_area > gaussian_area {
        let width = (target_area - gaussian_area) / pulse.amp.abs();
        GaussianSquare {
            duration: round_up(width + n_sigmas * pulse.sigma, granularity),
            amp: sign * pulse.amp,
            width,
            ..*pulse
        }
    } else {
        let amp_scale = sign * target_area / gaussian_area;
        GaussianSquare {
            duration: round_up(n_sigmas * pulse.sigma, granularity),
            amp: pulse.amp * amp_scale,
            width: 0.0,
            ..*pulse
        }
    };

    Ok(scaled)
}

fn cr_data(
    map: &InstructionMap,
    control: u32,
    target: u32,
) -> PulseResult<&CrossResonance> {
    map.cross_resonance(control, target)
        .ok_or_else(|| PulseError::MissingCalibration {
            gate: "rzx".to_string(),
            qubits: vec![control, target],
        })
}

/// One stretched CR segment: the tone on the control channel and the
/// compensation tone on the target drive, both scaled to the same angle.
fn cr_segment(
    map: &InstructionMap,
    control: u32,
    target: u32,
    theta: f64,
) -> PulseResult<Schedule> {
    let cr = cr_data(map, control, target)?;
    let mut segment = Schedule::new("cr");
    let tone = rescale_cr_pulse(&cr.cr_pulse, theta, map.granularity)?;
    segment.play(Channel::Control(cr.control_channel), Waveform::GaussianSquare(tone));
    if let Some(rotary) = &cr.rotary {
        let rotary = rescale_cr_pulse(rotary, theta, map.granularity)?;
        segment.play(Channel::Drive(target), Waveform::GaussianSquare(rotary));
    }
    Ok(segment)
}

fn schedule_name(theta: f64) -> String {
    format!("rzx({theta})")
}

/// Schedule for `RZX(theta)` using a single CR segment, without echo.
///
/// The canonical half pulse is stretched for `2 * theta`; the control drive is
/// kept idle for the segment so that the control qubit is blocked while the
/// tone plays. Only the native direction of the pair is supported.
pub fn rzx_schedule_no_echo(
    map: &InstructionMap,
    control: u32,
    target: u32,
    theta: f64,
) -> PulseResult<Schedule> {
    let mut schedule = Schedule::new(schedule_name(theta));
    // Look the pair up even for a zero angle so a missing pair still fails.
    cr_data(map, control, target)?;
    if theta.abs() < ZERO_ANGLE {
        return Ok(schedule);
    }
    let segment = cr_segment(map, control, target, 2.0 * theta)?;
    schedule.insert_schedule(0, &segment);
    schedule.delay(Channel::Drive(control), segment.duration());
    Ok(schedule)
}

/// Schedule for `RZX(theta)` as `CR(theta) X(c) CR(-theta) X(c)`.
///
/// The echo pulse is the control qubit's native `x`.
pub fn rzx_schedule_echoed(
    map: &InstructionMap,
    control: u32,
    target: u32,
    theta: f64,
) -> PulseResult<Schedule> {
    let mut schedule = Schedule::new(schedule_name(theta));
    cr_data(map, control, target)?;
    if theta.abs() < ZERO_ANGLE {
        return Ok(schedule);
    }
    let echo = map.get_calibration("x", &[control], &[])?;
    let plus = cr_segment(map, control, target, theta)?;
    let minus = cr_segment(map, control, target, -theta)?;
    schedule
        .append_sequential(&plus)
        .append_sequential(&echo)
        .append_sequential(&minus)
        .append_sequential(&echo);
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::PulseInstruction;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_4, PI};

    fn canonical() -> GaussianSquare {
        GaussianSquare {
            duration: 688,
            amp: 0.3,
            angle: 0.0,
            sigma: 64.0,
            width: 432.0,
        }
    }

    #[test]
    fn test_rescale_full_angle_keeps_area() {
        let p = canonical();
        let scaled = rescale_cr_pulse(&p, FRAC_PI_2, 16).unwrap();
        assert_relative_eq!(scaled.width, 432.0, epsilon = 1e-9);
        assert_eq!(scaled.duration, 688);
        assert_relative_eq!(scaled.amp, 0.3);
    }

    #[test]
    fn test_rescale_half_angle_shortens_flat_top() {
        let p = canonical();
        let scaled = rescale_cr_pulse(&p, FRAC_PI_4, 16).unwrap();
        let expected_width = (p.area() / 2.0 - p.gaussian_area()) / 0.3;
        assert_relative_eq!(scaled.width, expected_width, epsilon = 1e-9);
        assert_eq!(scaled.duration % 16, 0);
        assert!(scaled.duration as f64 >= scaled.width + 4.0 * 64.0);
        assert!(scaled.duration < p.duration);
    }

    #[test]
    fn test_rescale_small_angle_scales_amplitude() {
        let p = canonical();
        let scaled = rescale_cr_pulse(&p, 0.01, 16).unwrap();
        assert_eq!(scaled.width, 0.0);
        assert_eq!(scaled.duration, 256);
        let expected = 0.01 / FRAC_PI_2 * p.area() / p.gaussian_area();
        assert_relative_eq!(scaled.amp, 0.3 * expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rescale_negative_angle_flips_amplitude() {
        let p = canonical();
        let pos = rescale_cr_pulse(&p, 0.3, 16).unwrap();
        let neg = rescale_cr_pulse(&p, -0.3, 16).unwrap();
        assert_relative_eq!(pos.amp, -neg.amp);
        assert_eq!(pos.duration, neg.duration);
    }

    #[test]
    fn test_rescale_large_angle_lengthens_pulse() {
        let p = canonical();
        let scaled = rescale_cr_pulse(&p, PI, 16).unwrap();
        assert!(scaled.duration > p.duration);
        assert_relative_eq!(scaled.amp, 0.3);
        assert!(rescale_cr_pulse(&GaussianSquare { amp: 0.0, ..p }, 0.1, 16).is_err());
    }

    #[test]
    fn test_no_echo_schedule() {
        let map = InstructionMap::synthetic(2, &[(0, 1)]);
        let s = rzx_schedule_no_echo(&map, 0, 1, 0.4).unwrap();
        assert_eq!(s.instructions.len(), 3);
        let delay = s
            .instructions
            .iter()
            .find(|t| matches!(t.instruction, PulseInstruction::Delay { .. }))
            .unwrap();
        assert_eq!(delay.instruction.channel(), Channel::Drive(0));
        assert_eq!(delay.instruction.duration(), s.duration());
    }

    #[test]
    fn test_no_echo_zero_angle_is_empty() {
        let map = InstructionMap::synthetic(2, &[(0, 1)]);
        assert!(rzx_schedule_no_echo(&map, 0, 1, 0.0).unwrap().is_empty());
        assert!(rzx_schedule_no_echo(&map, 1, 0, 0.0).is_err());
    }

    #[test]
    fn test_echoed_schedule_structure() {
        let map = InstructionMap::synthetic(2, &[(0, 1)]);
        let s = rzx_schedule_echoed(&map, 0, 1, 0.4).unwrap();
        let tones: Vec<f64> = s
            .instructions
            .iter()
            .filter_map(|t| match &t.instruction {
                PulseInstruction::Play {
                    channel: Channel::Control(_),
                    waveform: Waveform::GaussianSquare(p),
                } => Some(p.amp),
                _ => None,
            })
            .collect();
        assert_eq!(tones.len(), 2);
        assert_relative_eq!(tones[0], -tones[1]);
    }

    #[test]
    fn test_distinct_angles_distinct_schedules() {
        let map = InstructionMap::synthetic(2, &[(0, 1)]);
        let a = rzx_schedule_no_echo(&map, 0, 1, 0.2).unwrap();
        let b = rzx_schedule_no_echo(&map, 0, 1, 0.3).unwrap();
        let c = rzx_schedule_no_echo(&map, 0, 1, 0.2).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
