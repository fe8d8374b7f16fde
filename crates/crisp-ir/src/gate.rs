//! Gate types.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;

/// Name of the opaque two-qubit gate produced by block consolidation.
pub const UNITARY_GATE_NAME: &str = "unitary";

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),
    /// Cross-resonance rotation `exp(-i θ/2 Z⊗X)`, control first.
    RZX(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::RZX(_) => "rzx",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Build a gate from its name and parameters.
    ///
    /// Returns `None` for unknown names or a wrong parameter count.
    pub fn from_name(name: &str, params: Vec<ParameterExpression>) -> Option<Self> {
        let mut params = params.into_iter();
        let mut next = || params.next();
        let gate = match name {
            "id" => StandardGate::I,
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(next()?),
            "ry" => StandardGate::Ry(next()?),
            "rz" => StandardGate::Rz(next()?),
            "p" => StandardGate::P(next()?),
            "u" => StandardGate::U(next()?, next()?, next()?),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "ch" => StandardGate::CH,
            "swap" => StandardGate::Swap,
            "iswap" => StandardGate::ISwap,
            "crx" => StandardGate::CRx(next()?),
            "cry" => StandardGate::CRy(next()?),
            "crz" => StandardGate::CRz(next()?),
            "cp" => StandardGate::CP(next()?),
            "rxx" => StandardGate::RXX(next()?),
            "ryy" => StandardGate::RYY(next()?),
            "rzz" => StandardGate::RZZ(next()?),
            "rzx" => StandardGate::RZX(next()?),
            "ccx" => StandardGate::CCX,
            "cswap" => StandardGate::CSwap,
            _ => return None,
        };
        if next().is_some() {
            return None;
        }
        Some(gate)
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(_, _, _) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_)
            | StandardGate::RZX(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Check if any parameter is symbolic.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p)
            | StandardGate::RZX(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }
}

/// A quantum gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A custom gate with an optional matrix or definition.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }

    /// Parameters of the gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            GateKind::Standard(g) => g.parameters(),
            GateKind::Custom(g) => g.params.iter().collect(),
        }
    }
}

/// A gate outside the standard set.
///
/// It may carry a unitary matrix (the consolidated `unitary` gate does), a
/// definition in terms of other instructions on local qubits `0..num_qubits`,
/// or neither, in which case only the backend can interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameters of the gate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParameterExpression>,
    /// Unitary matrix, row-major `2^n x 2^n`, first qubit most significant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Complex64>>,
    /// Body of the gate over local qubit indices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Vec<Instruction>>,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
            matrix: None,
            definition: None,
        }
    }

    /// Two-qubit `unitary` gate holding a 4x4 matrix.
    pub fn unitary(matrix: Vec<Complex64>) -> IrResult<Self> {
        Self::new(UNITARY_GATE_NAME, 2).with_matrix(matrix)
    }

    /// Add parameters to the gate.
    #[must_use]
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }

    /// Attach a unitary matrix.
    ///
    /// Gates too wide for a `2^n x 2^n` matrix to be addressable are
    /// rejected; their expected size is reported as `usize::MAX`.
    pub fn with_matrix(mut self, matrix: Vec<Complex64>) -> IrResult<Self> {
        let expected = 1usize
            .checked_shl(self.num_qubits)
            .and_then(|dim| dim.checked_mul(dim));
        if expected != Some(matrix.len()) {
            return Err(IrError::InvalidMatrix {
                gate_name: self.name,
                expected: expected.unwrap_or(usize::MAX),
                got: matrix.len(),
            });
        }
        self.matrix = Some(matrix);
        Ok(self)
    }

    /// Attach a definition over local qubits.
    pub fn with_definition(mut self, body: Vec<Instruction>) -> IrResult<Self> {
        if let Some(q) = body
            .iter()
            .flat_map(|inst| inst.qubits.iter())
            .find(|q| q.0 >= self.num_qubits)
        {
            return Err(IrError::QubitNotFound {
                qubit: *q,
                gate_name: Some(self.name),
            });
        }
        self.definition = Some(body);
        Ok(self)
    }
}

/// Classical condition for conditional gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The name of the classical register.
    pub register: String,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional label for the gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            label: None,
            condition: None,
        }
    }

    /// Create a new gate from a custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            label: None,
            condition: None,
        }
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// Numeric parameter values, or `None` if any is symbolic.
    pub fn param_values(&self) -> Option<Vec<f64>> {
        self.kind.parameters().iter().map(|p| p.as_f64()).collect()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::custom(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::QubitId;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::RZX(PI.into()).num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::RZX(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_from_name() {
        let rzx = StandardGate::from_name("rzx", vec![0.5.into()]).unwrap();
        assert_eq!(rzx, StandardGate::RZX(0.5.into()));
        assert_eq!(
            StandardGate::from_name("u", vec![1.0.into(), 2.0.into(), 3.0.into()])
                .unwrap()
                .name(),
            "u"
        );
        assert!(StandardGate::from_name("rz", vec![]).is_none());
        assert!(StandardGate::from_name("h", vec![1.0.into()]).is_none());
        assert!(StandardGate::from_name("nope", vec![]).is_none());
    }

    #[test]
    fn test_param_values() {
        let g = Gate::standard(StandardGate::U(1.0.into(), ParameterExpression::pi(), 0.0.into()));
        assert_eq!(g.param_values(), Some(vec![1.0, PI, 0.0]));
        let g = Gate::standard(StandardGate::Rz(ParameterExpression::symbol("a")));
        assert_eq!(g.param_values(), None);
        assert_eq!(Gate::standard(StandardGate::X).param_values(), Some(vec![]));
    }

    #[test]
    fn test_unitary_gate_matrix_size() {
        let identity: Vec<Complex64> = (0..16)
            .map(|i| if i % 5 == 0 { Complex64::new(1.0, 0.0) } else { Complex64::new(0.0, 0.0) })
            .collect();
        let gate = CustomGate::unitary(identity).unwrap();
        assert_eq!(gate.name, UNITARY_GATE_NAME);
        assert!(CustomGate::unitary(vec![Complex64::new(1.0, 0.0); 4]).is_err());
    }

    #[test]
    fn test_wide_matrix_gate_rejected() {
        for num_qubits in [32, 40, 64, u32::MAX] {
            let err = CustomGate::new("wide", num_qubits)
                .with_matrix(vec![])
                .unwrap_err();
            assert!(matches!(
                err,
                IrError::InvalidMatrix { expected: usize::MAX, got: 0, .. }
            ));
        }
    }

    #[test]
    fn test_definition_qubits_checked() {
        let body = vec![Instruction::single_qubit_gate(StandardGate::H, QubitId(2))];
        assert!(CustomGate::new("bad", 2).with_definition(body).is_err());
        let body = vec![Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1))];
        assert!(CustomGate::new("good", 2).with_definition(body).is_ok());
    }
}
