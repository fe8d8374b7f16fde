//! Parametric pulse envelopes and their sampled IQ values.
//!
//! Durations are in units of the backend sample time `dt`; amplitudes are
//! normalized to the DAC range, so `|amp| <= 1` always holds for a valid pulse.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::f64::consts::PI;

use crate::error::{PulseError, PulseResult};

/// Gaussian rise and fall around a constant flat top.
///
/// The rise and fall together span `duration - width` samples; the flat top
/// spans `width` samples at full amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianSquare {
    /// Total duration in samples.
    pub duration: u64,
    /// Peak amplitude magnitude, may be negative.
    pub amp: f64,
    /// Phase of the complex amplitude.
    #[serde(default)]
    pub angle: f64,
    /// Standard deviation of the rise and fall.
    pub sigma: f64,
    /// Flat-top length in samples.
    pub width: f64,
}

impl GaussianSquare {
    /// Number of standard deviations spanned by the rise plus fall.
    pub fn risefall_sigmas(&self) -> f64 {
        (self.duration as f64 - self.width) / self.sigma
    }

    /// Integrated area of the rise and fall.
    pub fn gaussian_area(&self) -> f64 {
        self.amp.abs() * self.sigma * (2.0 * PI).sqrt() * erf(self.risefall_sigmas())
    }

    /// Integrated area of the whole envelope.
    pub fn area(&self) -> f64 {
        self.gaussian_area() + self.amp.abs() * self.width
    }

    /// Check the shape parameters.
    pub fn validate(&self) -> PulseResult<()> {
        if self.sigma.is_nan() || self.sigma <= 0.0 {
            return Err(PulseError::InvalidPulse(format!(
                "gaussian_square sigma must be positive, got {}",
                self.sigma
            )));
        }
        if self.amp.abs() > 1.0 {
            return Err(PulseError::InvalidPulse(format!(
                "gaussian_square |amp| must not exceed 1, got {}",
                self.amp
            )));
        }
        if self.width < 0.0 || self.width > self.duration as f64 {
            return Err(PulseError::InvalidPulse(format!(
                "gaussian_square width {} outside [0, {}]",
                self.width, self.duration
            )));
        }
        Ok(())
    }

    fn envelope(&self, t: f64) -> f64 {
        let rise = (self.duration as f64 - self.width) / 2.0;
        let fall_start = rise + self.width;
        let gauss = |x: f64| (-0.5 * (x / self.sigma).powi(2)).exp();
        if t < rise {
            gauss(t - rise)
        } else if t < fall_start {
            1.0
        } else {
            gauss(t - fall_start)
        }
    }
}

/// Gaussian with a derivative quadrature component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    /// Total duration in samples.
    pub duration: u64,
    /// Peak amplitude magnitude.
    pub amp: f64,
    /// Phase of the complex amplitude.
    #[serde(default)]
    pub angle: f64,
    /// Standard deviation.
    pub sigma: f64,
    /// Derivative scale.
    #[serde(default)]
    pub beta: f64,
}

/// Constant-amplitude pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// Total duration in samples.
    pub duration: u64,
    /// Amplitude magnitude.
    pub amp: f64,
    /// Phase of the complex amplitude.
    #[serde(default)]
    pub angle: f64,
}

/// A parametric waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Waveform {
    /// Flat-top Gaussian, used for cross-resonance tones.
    GaussianSquare(GaussianSquare),
    /// DRAG pulse, used for single-qubit rotations.
    Drag(Drag),
    /// Constant pulse.
    Constant(Constant),
}

impl Waveform {
    /// Duration in samples.
    pub fn duration(&self) -> u64 {
        match self {
            Waveform::GaussianSquare(p) => p.duration,
            Waveform::Drag(p) => p.duration,
            Waveform::Constant(p) => p.duration,
        }
    }

    /// Short name of the shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Waveform::GaussianSquare(_) => "gaussian_square",
            Waveform::Drag(_) => "drag",
            Waveform::Constant(_) => "constant",
        }
    }

    /// Sample the waveform into IQ values, one per `dt`.
    pub fn samples(&self) -> Vec<Complex64> {
        match self {
            Waveform::GaussianSquare(p) => {
                let scale = Complex64::from_polar(p.amp, p.angle);
                (0..p.duration)
                    .map(|t| scale * p.envelope(t as f64 + 0.5))
                    .collect()
            }
            Waveform::Drag(p) => {
                let scale = Complex64::from_polar(p.amp, p.angle);
                let center = p.duration as f64 / 2.0;
                (0..p.duration)
                    .map(|t| {
                        let x = t as f64 + 0.5 - center;
                        let g = (-0.5 * (x / p.sigma).powi(2)).exp();
                        let dg = -x / (p.sigma * p.sigma) * g;
                        scale * Complex64::new(g, p.beta * dg)
                    })
                    .collect()
            }
            Waveform::Constant(p) => {
                vec![Complex64::from_polar(p.amp, p.angle); p.duration as usize]
            }
        }
    }
}
