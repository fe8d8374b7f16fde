//! Calibration keys: which gate instance a pulse schedule belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::instruction::Instruction;
use crate::qubit::QubitId;

/// Identifies one calibrated gate instance: name, ordered qubits and the exact
/// parameter values.
///
/// Parameters are compared by bit pattern, so two angles share a calibration
/// only if they are the identical `f64`. Negative zero is folded into zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalibrationKey {
    /// Gate name.
    pub gate: String,
    /// Ordered qubit operands.
    pub qubits: Vec<QubitId>,
    /// Parameter values as `f64::to_bits`.
    pub params: Vec<u64>,
}

impl CalibrationKey {
    /// Create a key from numeric parameters.
    pub fn new(gate: impl Into<String>, qubits: Vec<QubitId>, params: &[f64]) -> Self {
        Self {
            gate: gate.into(),
            qubits,
            params: params.iter().map(|p| (p + 0.0).to_bits()).collect(),
        }
    }

    /// Key of a gate instruction, or `None` for directives and symbolic gates.
    pub fn for_instruction(inst: &Instruction) -> Option<Self> {
        let gate = inst.as_gate()?;
        let params = gate.param_values()?;
        Some(Self::new(gate.name(), inst.qubits.clone(), &params))
    }

    /// Parameter values.
    pub fn param_values(&self) -> Vec<f64> {
        self.params.iter().map(|&b| f64::from_bits(b)).collect()
    }
}

impl fmt::Display for CalibrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gate)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.param_values().iter().map(|p| p.to_string()).collect();
            write!(f, "({})", params.join(", "))?;
        }
        let qubits: Vec<String> = self.qubits.iter().map(|q| q.to_string()).collect();
        write!(f, " {}", qubits.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;

    #[test]
    fn test_key_from_instruction() {
        let inst = Instruction::two_qubit_gate(StandardGate::RZX(0.25.into()), QubitId(0), QubitId(1));
        let key = CalibrationKey::for_instruction(&inst).unwrap();
        assert_eq!(key, CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.25]));
        assert_eq!(key.to_string(), "rzx(0.25) q0, q1");
    }

    #[test]
    fn test_negative_zero_folds() {
        let a = CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.0]);
        let b = CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[-0.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_angles_distinct_keys() {
        let a = CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.1]);
        let b = CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.1 + 1e-15]);
        let c = CalibrationKey::new("rzx", vec![QubitId(1), QubitId(0)], &[0.1]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_symbolic_has_no_key() {
        let inst = Instruction::two_qubit_gate(
            StandardGate::RZX(crate::ParameterExpression::symbol("t")),
            QubitId(0),
            QubitId(1),
        );
        assert!(CalibrationKey::for_instruction(&inst).is_none());
        assert!(CalibrationKey::for_instruction(&Instruction::barrier([QubitId(0)])).is_none());
    }
}
