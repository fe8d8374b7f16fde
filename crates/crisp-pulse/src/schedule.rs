//! Timed pulse schedules.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::waveform::Waveform;

/// A single pulse-level instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PulseInstruction {
    /// Play a waveform on a channel.
    Play {
        /// Output channel.
        channel: Channel,
        /// Envelope to play.
        waveform: Waveform,
    },
    /// Idle a channel.
    Delay {
        /// Output channel.
        channel: Channel,
        /// Idle time in samples.
        duration: u64,
    },
    /// Advance the frame phase of a channel.
    ShiftPhase {
        /// Output channel.
        channel: Channel,
        /// Phase increment in radians.
        phase: f64,
    },
}

impl PulseInstruction {
    /// Channel the instruction acts on.
    pub fn channel(&self) -> Channel {
        match self {
            PulseInstruction::Play { channel, .. }
            | PulseInstruction::Delay { channel, .. }
            | PulseInstruction::ShiftPhase { channel, .. } => *channel,
        }
    }

    /// Duration in samples. Phase shifts are instantaneous.
    pub fn duration(&self) -> u64 {
        match self {
            PulseInstruction::Play { waveform, .. } => waveform.duration(),
            PulseInstruction::Delay { duration, .. } => *duration,
            PulseInstruction::ShiftPhase { .. } => 0,
        }
    }
}

/// An instruction placed at an absolute start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInstruction {
    /// Start time in samples.
    pub start: u64,
    /// The instruction.
    #[serde(flatten)]
    pub instruction: PulseInstruction,
}

/// A pulse schedule: a named list of timed instructions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Schedule name.
    pub name: String,
    /// Instructions in insertion order.
    pub instructions: Vec<TimedInstruction>,
}

impl Schedule {
    /// Create an empty schedule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Whether the schedule has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Total duration: the latest stop time over all channels.
    pub fn duration(&self) -> u64 {
        self.instructions
            .iter()
            .map(|t| t.start + t.instruction.duration())
            .max()
            .unwrap_or(0)
    }

    /// Stop time of the last instruction on `channel`.
    pub fn channel_duration(&self, channel: Channel) -> u64 {
        self.instructions
            .iter()
            .filter(|t| t.instruction.channel() == channel)
            .map(|t| t.start + t.instruction.duration())
            .max()
            .unwrap_or(0)
    }

    /// Channels used by the schedule, sorted and deduplicated.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<_> = self
            .instructions
            .iter()
            .map(|t| t.instruction.channel())
            .collect();
        channels.sort();
        channels.dedup();
        channels
    }

    /// Insert an instruction at an absolute time.
    pub fn insert(&mut self, start: u64, instruction: PulseInstruction) -> &mut Self {
        self.instructions.push(TimedInstruction { start, instruction });
        self
    }

    /// Append an instruction after the last instruction on its channel.
    pub fn append(&mut self, instruction: PulseInstruction) -> &mut Self {
        let start = self.channel_duration(instruction.channel());
        self.insert(start, instruction)
    }

    /// Play a waveform at the end of a channel.
    pub fn play(&mut self, channel: Channel, waveform: Waveform) -> &mut Self {
        self.append(PulseInstruction::Play { channel, waveform })
    }

    /// Idle a channel for `duration` samples.
    pub fn delay(&mut self, channel: Channel, duration: u64) -> &mut Self {
        self.append(PulseInstruction::Delay { channel, duration })
    }

    /// Shift the frame phase of a channel.
    pub fn shift_phase(&mut self, channel: Channel, phase: f64) -> &mut Self {
        self.append(PulseInstruction::ShiftPhase { channel, phase })
    }

    /// Insert every instruction of `other`, offset by `start`.
    pub fn insert_schedule(&mut self, start: u64, other: &Schedule) -> &mut Self {
        for timed in &other.instructions {
            self.insert(start + timed.start, timed.instruction.clone());
        }
        self
    }

    /// Place `other` after everything already in the schedule.
    pub fn append_sequential(&mut self, other: &Schedule) -> &mut Self {
        let start = self.duration();
        self.insert_schedule(start, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Constant;

    fn constant(duration: u64) -> Waveform {
        Waveform::Constant(Constant {
            duration,
            amp: 0.1,
            angle: 0.0,
        })
    }

    #[test]
    fn test_append_per_channel() {
        let mut s = Schedule::new("test");
        s.play(Channel::Drive(0), constant(100));
        s.play(Channel::Drive(1), constant(40));
        s.play(Channel::Drive(0), constant(20));

        assert_eq!(s.instructions[1].start, 0);
        assert_eq!(s.instructions[2].start, 100);
        assert_eq!(s.duration(), 120);
        assert_eq!(s.channel_duration(Channel::Drive(1)), 40);
        assert_eq!(s.channels(), vec![Channel::Drive(0), Channel::Drive(1)]);
    }

    #[test]
    fn test_append_sequential() {
        let mut a = Schedule::new("a");
        a.play(Channel::Drive(0), constant(100));
        let mut b = Schedule::new("b");
        b.play(Channel::Drive(1), constant(30));

        a.append_sequential(&b);
        assert_eq!(a.instructions[1].start, 100);
        assert_eq!(a.duration(), 130);
    }

    #[test]
    fn test_shift_phase_is_instantaneous() {
        let mut s = Schedule::new("phase");
        s.shift_phase(Channel::Drive(0), 0.5);
        assert_eq!(s.duration(), 0);
        assert!(!s.is_empty());
    }
}
