//! Hardware output channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pulse output channel.
///
/// `Drive(q)` addresses qubit `q` directly; `Control(u)` is the cross-resonance
/// line `u`, which plays at the target qubit's frequency on the control qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Qubit drive channel.
    Drive(u32),
    /// Cross-resonance control channel.
    Control(u32),
}

impl Channel {
    /// Channel index.
    pub fn index(&self) -> u32 {
        match self {
            Channel::Drive(i) | Channel::Control(i) => *i,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Drive(i) => write!(f, "d{i}"),
            Channel::Control(i) => write!(f, "u{i}"),
        }
    }
}
