//! Single-qubit Euler synthesis into hardware bases.

use std::f64::consts::PI;

use crisp_ir::{ParameterExpression, StandardGate};

use crate::config::BasisGates;
use crate::unitary::Unitary2x2;

/// Target basis for 1-qubit gate synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EulerBasis {
    /// RZ, SX and X; X replaces the two SX of a pi rotation.
    ZSXX,
    /// RZ and SX (IBM native).
    ZSX,
    /// A single U(theta, phi, lambda).
    U,
    /// RZ, RY, RZ.
    ZYZ,
}

impl EulerBasis {
    /// All bases, in order of preference on ties.
    pub const ALL: [EulerBasis; 4] = [
        EulerBasis::ZSXX,
        EulerBasis::ZSX,
        EulerBasis::U,
        EulerBasis::ZYZ,
    ];

    /// Gate names the basis emits.
    pub fn gate_names(&self) -> &'static [&'static str] {
        match self {
            EulerBasis::ZSXX => &["rz", "sx", "x"],
            EulerBasis::ZSX => &["rz", "sx"],
            EulerBasis::U => &["u"],
            EulerBasis::ZYZ => &["rz", "ry"],
        }
    }

    /// Bases whose gates all lie in `basis`.
    pub fn supported_by(basis: &BasisGates) -> Vec<EulerBasis> {
        Self::ALL
            .into_iter()
            .filter(|b| b.gate_names().iter().all(|g| basis.contains(g)))
            .collect()
    }

    /// Gates realizing `unitary` up to global phase, in temporal order.
    ///
    /// Rotations by a multiple of 2 pi (within `atol`) are omitted, so the
    /// identity synthesizes to an empty sequence.
    pub fn synthesize(&self, unitary: &Unitary2x2, atol: f64) -> Vec<StandardGate> {
        let (phi, theta, lambda, _phase) = unitary.zyz_decomposition();
        let near = |x: f64, target: f64| (x - target).abs() <= atol;

        match self {
            EulerBasis::U => {
                if near(theta, 0.0) && is_trivial(phi + lambda, atol) {
                    return vec![];
                }
                vec![StandardGate::U(
                    constant(theta),
                    constant(Unitary2x2::normalize_angle(phi)),
                    constant(Unitary2x2::normalize_angle(lambda)),
                )]
            }
            EulerBasis::ZYZ => {
                let mut gates = Vec::new();
                if near(theta, 0.0) {
                    push_rz(&mut gates, phi + lambda, atol);
                    return gates;
                }
                push_rz(&mut gates, lambda, atol);
                gates.push(StandardGate::Ry(constant(theta)));
                push_rz(&mut gates, phi, atol);
                gates
            }
            EulerBasis::ZSX | EulerBasis::ZSXX => {
                let mut gates = Vec::new();
                if near(theta, 0.0) {
                    push_rz(&mut gates, phi + lambda, atol);
                } else if near(theta, PI / 2.0) {
                    push_rz(&mut gates, lambda - PI / 2.0, atol);
                    gates.push(StandardGate::SX);
                    push_rz(&mut gates, phi + PI / 2.0, atol);
                } else if *self == EulerBasis::ZSXX && near(theta, PI) {
                    push_rz(&mut gates, lambda - PI / 2.0, atol);
                    gates.push(StandardGate::X);
                    push_rz(&mut gates, phi + PI / 2.0, atol);
                } else {
                    // RY(t) = RZ(-pi) SX RZ(t + pi) SX up to phase.
                    push_rz(&mut gates, lambda, atol);
                    gates.push(StandardGate::SX);
                    push_rz(&mut gates, theta + PI, atol);
                    gates.push(StandardGate::SX);
                    push_rz(&mut gates, phi + PI, atol);
                }
                gates
            }
        }
    }
}

impl std::fmt::Display for EulerBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EulerBasis::ZSXX => "ZSXX",
            EulerBasis::ZSX => "ZSX",
            EulerBasis::U => "U",
            EulerBasis::ZYZ => "ZYZ",
        };
        f.write_str(name)
    }
}

/// Shortest synthesis of `unitary` over `bases`; ties go to the earlier basis.
pub fn synthesize_best(
    unitary: &Unitary2x2,
    bases: &[EulerBasis],
    atol: f64,
) -> Option<(EulerBasis, Vec<StandardGate>)> {
    bases
        .iter()
        .map(|b| (*b, b.synthesize(unitary, atol)))
        .min_by_key(|(_, gates)| gates.len())
}

fn constant(value: f64) -> ParameterExpression {
    ParameterExpression::constant(value)
}

fn is_trivial(angle: f64, atol: f64) -> bool {
    Unitary2x2::normalize_angle(angle).abs() <= atol
}

fn push_rz(gates: &mut Vec<StandardGate>, angle: f64, atol: f64) {
    if !is_trivial(angle, atol) {
        gates.push(StandardGate::Rz(constant(Unitary2x2::normalize_angle(angle))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ATOL: f64 = 1e-12;

    fn product(gates: &[StandardGate]) -> Unitary2x2 {
        gates.iter().fold(Unitary2x2::identity(), |acc, g| {
            Unitary2x2::from_standard(g).unwrap() * acc
        })
    }

    fn same_up_to_phase(a: &Unitary2x2, b: &Unitary2x2) -> bool {
        let overlap: num_complex::Complex64 =
            a.data.iter().zip(b.data.iter()).map(|(x, y)| y.conj() * x).sum();
        (overlap.norm() - 2.0).abs() < 1e-9
    }

    #[test]
    fn test_identity_is_empty() {
        for basis in EulerBasis::ALL {
            assert!(basis.synthesize(&Unitary2x2::identity(), ATOL).is_empty());
        }
    }

    #[test]
    fn test_x_uses_x_in_zsxx() {
        let gates = EulerBasis::ZSXX.synthesize(&Unitary2x2::x(), ATOL);
        assert!(gates.contains(&StandardGate::X));
        assert!(gates.len() <= 3);
        assert!(same_up_to_phase(&product(&gates), &Unitary2x2::x()));

        let gates = EulerBasis::ZSX.synthesize(&Unitary2x2::x(), ATOL);
        assert!(!gates.contains(&StandardGate::X));
        assert!(same_up_to_phase(&product(&gates), &Unitary2x2::x()));
    }

    #[test]
    fn test_hadamard_uses_one_sx() {
        let gates = EulerBasis::ZSX.synthesize(&Unitary2x2::h(), ATOL);
        assert_eq!(gates.iter().filter(|g| **g == StandardGate::SX).count(), 1);
        assert!(same_up_to_phase(&product(&gates), &Unitary2x2::h()));
    }

    #[test]
    fn test_z_rotation_is_single_rz() {
        let u = Unitary2x2::rz(0.7);
        let gates = EulerBasis::ZSX.synthesize(&u, ATOL);
        assert_eq!(gates.len(), 1);
        assert!(same_up_to_phase(&product(&gates), &u));
    }

    #[test]
    fn test_supported_by() {
        let basis = BasisGates::new(["rz", "sx", "x", "rxx"]);
        assert_eq!(
            EulerBasis::supported_by(&basis),
            vec![EulerBasis::ZSXX, EulerBasis::ZSX]
        );
        let basis = BasisGates::new(["u", "cx"]);
        assert_eq!(EulerBasis::supported_by(&basis), vec![EulerBasis::U]);
    }

    #[test]
    fn test_best_prefers_shorter() {
        let u = Unitary2x2::ry(0.4);
        let (basis, gates) =
            synthesize_best(&u, &[EulerBasis::ZSX, EulerBasis::U], ATOL).unwrap();
        assert_eq!(basis, EulerBasis::U);
        assert_eq!(gates.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_synthesis_reconstructs(
            theta in 0.0f64..PI,
            phi in -PI..PI,
            lambda in -PI..PI,
        ) {
            let u = Unitary2x2::u(theta, phi, lambda);
            for basis in EulerBasis::ALL {
                let gates = basis.synthesize(&u, ATOL);
                prop_assert!(same_up_to_phase(&product(&gates), &u), "{} failed", basis);
            }
        }
    }
}
