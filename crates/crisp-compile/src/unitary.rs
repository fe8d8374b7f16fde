//! Unitary matrix utilities.
//!
//! [`Unitary2x2`] covers the single-qubit algebra used by the Euler
//! re-synthesis. [`gate_matrix`] gives the dense matrix of any gate with
//! numeric parameters, in the big-endian convention used throughout the
//! crate: the first operand is the most significant tensor factor.

use crisp_ir::{Gate, GateKind, StandardGate};
use nalgebra::{DMatrix, Matrix2, Matrix4};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Tolerance for floating point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Below this magnitude an entry carries no usable phase.
const DEGENERATE: f64 = 1e-14;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 unitary matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Self::new(s, s, s, -s)
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(ZERO, ONE, ONE, ZERO)
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(ZERO, -I, I, ZERO)
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::new(ONE, ZERO, ZERO, -ONE)
    }

    /// Create an S gate (sqrt(Z)).
    pub fn s() -> Self {
        Self::p(PI / 2.0)
    }

    /// Create an S-dagger gate.
    pub fn sdg() -> Self {
        Self::p(-PI / 2.0)
    }

    /// Create a T gate (fourth root of Z).
    pub fn t() -> Self {
        Self::p(PI / 4.0)
    }

    /// Create a T-dagger gate.
    pub fn tdg() -> Self {
        Self::p(-PI / 4.0)
    }

    /// Create an SX gate (sqrt(X)).
    pub fn sx() -> Self {
        let half = Complex64::new(0.5, 0.0);
        let half_i = Complex64::new(0.0, 0.5);
        Self::new(half + half_i, half - half_i, half - half_i, half + half_i)
    }

    /// Create an SX-dagger gate.
    pub fn sxdg() -> Self {
        let half = Complex64::new(0.5, 0.0);
        let half_i = Complex64::new(0.0, 0.5);
        Self::new(half - half_i, half + half_i, half + half_i, half - half_i)
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Create a phase gate P(lambda).
    pub fn p(lambda: f64) -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::from_polar(1.0, lambda))
    }

    /// Create a U gate U(theta, phi, lambda).
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Matrix of a single-qubit standard gate, if its parameters are bound.
    pub fn from_standard(gate: &StandardGate) -> Option<Self> {
        match gate {
            StandardGate::I => Some(Self::identity()),
            StandardGate::X => Some(Self::x()),
            StandardGate::Y => Some(Self::y()),
            StandardGate::Z => Some(Self::z()),
            StandardGate::H => Some(Self::h()),
            StandardGate::S => Some(Self::s()),
            StandardGate::Sdg => Some(Self::sdg()),
            StandardGate::T => Some(Self::t()),
            StandardGate::Tdg => Some(Self::tdg()),
            StandardGate::SX => Some(Self::sx()),
            StandardGate::SXdg => Some(Self::sxdg()),
            StandardGate::Rx(p) => p.as_f64().map(Self::rx),
            StandardGate::Ry(p) => p.as_f64().map(Self::ry),
            StandardGate::Rz(p) => p.as_f64().map(Self::rz),
            StandardGate::P(p) => p.as_f64().map(Self::p),
            StandardGate::U(theta, phi, lambda) => {
                Some(Self::u(theta.as_f64()?, phi.as_f64()?, lambda.as_f64()?))
            }
            _ => None,
        }
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Get the conjugate transpose (dagger).
    pub fn dagger(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// Check if this is approximately identity (up to global phase).
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        if b.norm() > EPSILON || c.norm() > EPSILON {
            return false;
        }
        (a - d).norm() < EPSILON
    }

    /// Decompose into `e^{i phase} RZ(alpha) * RY(beta) * RZ(gamma)`.
    ///
    /// Returns `(alpha, beta, gamma, phase)` with `beta` in `[0, pi]`.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Remove the phase to land in SU(2):
        // [[cos(b/2) e^{-i(a+g)/2}, -sin(b/2) e^{-i(a-g)/2}],
        //  [sin(b/2) e^{ i(a-g)/2},  cos(b/2) e^{ i(a+g)/2}]]
        let phase_factor = Complex64::from_polar(1.0, -global_phase);
        let a = a * phase_factor;
        let c = c * phase_factor;

        let beta = 2.0 * c.norm().atan2(a.norm());

        if a.norm() < DEGENERATE {
            // beta = pi: only alpha - gamma is defined.
            let alpha_minus_gamma = 2.0 * c.arg();
            return (alpha_minus_gamma / 2.0, beta, -alpha_minus_gamma / 2.0, global_phase);
        }
        if c.norm() < DEGENERATE {
            // beta = 0: only alpha + gamma is defined.
            let alpha_plus_gamma = -2.0 * a.arg();
            return (alpha_plus_gamma / 2.0, beta, alpha_plus_gamma / 2.0, global_phase);
        }

        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();
        let alpha = f64::midpoint(alpha_plus_gamma, alpha_minus_gamma);
        let gamma = (alpha_plus_gamma - alpha_minus_gamma) / 2.0;

        (alpha, beta, gamma, global_phase)
    }

    /// Express as `e^{i phase} U(theta, phi, lambda)`.
    ///
    /// Returns `(theta, phi, lambda, phase)`.
    pub fn u_decomposition(&self) -> (f64, f64, f64, f64) {
        let (alpha, beta, gamma, phase) = self.zyz_decomposition();
        (beta, alpha, gamma, phase - f64::midpoint(alpha, gamma))
    }

    /// Convert to an nalgebra matrix.
    pub fn to_matrix(&self) -> Matrix2<Complex64> {
        let [a, b, c, d] = self.data;
        Matrix2::new(a, b, c, d)
    }

    /// Build from an nalgebra matrix.
    pub fn from_matrix(m: &Matrix2<Complex64>) -> Self {
        Self::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)])
    }

    /// Normalize angles to [-pi, pi].
    pub fn normalize_angle(angle: f64) -> f64 {
        if angle.is_nan() || angle.is_infinite() {
            return 0.0;
        }
        let mut a = angle.rem_euclid(2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    #[allow(clippy::needless_pass_by_value)]
    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

/// Kronecker product of two 2x2 matrices, `a` on the most significant qubit.
pub fn kron2(a: &Matrix2<Complex64>, b: &Matrix2<Complex64>) -> Matrix4<Complex64> {
    Matrix4::from_fn(|r, c| a[(r / 2, c / 2)] * b[(r % 2, c % 2)])
}

fn single(u: &Unitary2x2) -> DMatrix<Complex64> {
    DMatrix::from_row_slice(2, 2, &u.data)
}

fn controlled(u: &Unitary2x2) -> DMatrix<Complex64> {
    let mut m = DMatrix::<Complex64>::identity(4, 4);
    m[(2, 2)] = u.data[0];
    m[(2, 3)] = u.data[1];
    m[(3, 2)] = u.data[2];
    m[(3, 3)] = u.data[3];
    m
}

/// `exp(-i theta/2 P (x) Q)` for Paulis `P`, `Q`.
fn pauli_rotation(p: &Unitary2x2, q: &Unitary2x2, theta: f64) -> DMatrix<Complex64> {
    let pq = single(p).kronecker(&single(q));
    let cos = Complex64::new((theta / 2.0).cos(), 0.0);
    let sin = Complex64::new(0.0, -(theta / 2.0).sin());
    DMatrix::<Complex64>::identity(4, 4).map(|v| v * cos) + pq.map(|v| v * sin)
}

fn permutation(perm: &[usize]) -> DMatrix<Complex64> {
    let n = perm.len();
    let mut m = DMatrix::<Complex64>::zeros(n, n);
    for (col, &row) in perm.iter().enumerate() {
        m[(row, col)] = ONE;
    }
    m
}

/// Dense matrix of a standard gate with bound parameters.
pub fn standard_gate_matrix(gate: &StandardGate) -> Option<DMatrix<Complex64>> {
    if let Some(u) = Unitary2x2::from_standard(gate) {
        return Some(single(&u));
    }
    let param = |p: &crisp_ir::ParameterExpression| p.as_f64();
    let m = match gate {
        StandardGate::CX => controlled(&Unitary2x2::x()),
        StandardGate::CY => controlled(&Unitary2x2::y()),
        StandardGate::CZ => controlled(&Unitary2x2::z()),
        StandardGate::CH => controlled(&Unitary2x2::h()),
        StandardGate::CRx(p) => controlled(&Unitary2x2::rx(param(p)?)),
        StandardGate::CRy(p) => controlled(&Unitary2x2::ry(param(p)?)),
        StandardGate::CRz(p) => controlled(&Unitary2x2::rz(param(p)?)),
        StandardGate::CP(p) => controlled(&Unitary2x2::p(param(p)?)),
        StandardGate::Swap => permutation(&[0, 2, 1, 3]),
        StandardGate::ISwap => {
            let mut m = permutation(&[0, 2, 1, 3]);
            m[(1, 2)] = I;
            m[(2, 1)] = I;
            m
        }
        StandardGate::RXX(p) => pauli_rotation(&Unitary2x2::x(), &Unitary2x2::x(), param(p)?),
        StandardGate::RYY(p) => pauli_rotation(&Unitary2x2::y(), &Unitary2x2::y(), param(p)?),
        StandardGate::RZZ(p) => pauli_rotation(&Unitary2x2::z(), &Unitary2x2::z(), param(p)?),
        StandardGate::RZX(p) => pauli_rotation(&Unitary2x2::z(), &Unitary2x2::x(), param(p)?),
        StandardGate::CCX => permutation(&[0, 1, 2, 3, 4, 5, 7, 6]),
        StandardGate::CSwap => permutation(&[0, 1, 2, 3, 4, 6, 5, 7]),
        _ => return None,
    };
    Some(m)
}

/// Dense matrix of a gate, or `None` for symbolic parameters and custom
/// gates without a matrix.
pub fn gate_matrix(gate: &Gate) -> Option<DMatrix<Complex64>> {
    match &gate.kind {
        GateKind::Standard(g) => standard_gate_matrix(g),
        GateKind::Custom(custom) => {
            let dim = 1usize.checked_shl(custom.num_qubits)?;
            let data = custom.matrix.as_ref()?;
            if Some(data.len()) != dim.checked_mul(dim) {
                return None;
            }
            Some(DMatrix::from_row_slice(dim, dim, data))
        }
    }
}

/// Convert a dynamic 4x4 matrix to a fixed one.
pub fn to_matrix4(m: &DMatrix<Complex64>) -> Option<Matrix4<Complex64>> {
    if m.nrows() != 4 || m.ncols() != 4 {
        return None;
    }
    Some(Matrix4::from_fn(|r, c| m[(r, c)]))
}

/// Row-major entries of a 4x4 matrix.
pub fn row_major(m: &Matrix4<Complex64>) -> Vec<Complex64> {
    (0..4)
        .flat_map(|r| (0..4).map(move |c| m[(r, c)]))
        .collect()
}

/// Largest entry of `U^dagger U - I`.
pub fn unitarity_deviation(m: &Matrix4<Complex64>) -> f64 {
    (m.adjoint() * m - Matrix4::identity())
        .iter()
        .map(|v| v.norm())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crisp_ir::ParameterExpression;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn assert_same_up_to_phase(expected: &Unitary2x2, got: &Unitary2x2, phase: f64) {
        let global = Complex64::from_polar(1.0, phase);
        for i in 0..4 {
            let g = got.data[i] * global;
            assert!(
                (expected.data[i] - g).norm() < 1e-9,
                "Mismatch at {i}: expected {:?}, got {g:?}",
                expected.data[i]
            );
        }
    }

    #[test]
    fn test_identity() {
        assert!(Unitary2x2::identity().is_identity());
        assert!(Unitary2x2::rz(2.0 * PI).is_identity());
    }

    #[test]
    fn test_hadamard_squared() {
        let h = Unitary2x2::h();
        assert!((h * h).is_identity());
    }

    #[test]
    fn test_pauli_squared() {
        for p in [Unitary2x2::x(), Unitary2x2::y(), Unitary2x2::z()] {
            assert!((p * p).is_identity());
        }
    }

    #[test]
    fn test_sx_squared_is_x() {
        let sx = Unitary2x2::sx();
        assert_eq!((sx * sx).data, Unitary2x2::x().data);
        assert!((sx * Unitary2x2::sxdg()).is_identity());
    }

    #[test]
    fn test_zyz_reconstructs() {
        let cases = [
            Unitary2x2::h(),
            Unitary2x2::x(),
            Unitary2x2::y(),
            Unitary2x2::sx(),
            Unitary2x2::t(),
            Unitary2x2::u(0.3, -1.2, 2.5),
            Unitary2x2::rx(1e-7),
            Unitary2x2::u(PI, 0.4, 0.1),
        ];
        for u in cases {
            let (alpha, beta, gamma, phase) = u.zyz_decomposition();
            assert!((0.0..=PI + 1e-12).contains(&beta));
            let rebuilt = Unitary2x2::rz(alpha) * Unitary2x2::ry(beta) * Unitary2x2::rz(gamma);
            assert_same_up_to_phase(&u, &rebuilt, phase);
        }
    }

    #[test]
    fn test_u_decomposition_reconstructs() {
        let u = Unitary2x2::h() * Unitary2x2::t() * Unitary2x2::sx();
        let (theta, phi, lambda, phase) = u.u_decomposition();
        assert_same_up_to_phase(&u, &Unitary2x2::u(theta, phi, lambda), phase);
    }

    #[test]
    fn test_normalize_angle() {
        assert!(approx_eq(Unitary2x2::normalize_angle(3.0 * PI), PI));
        assert!(approx_eq(Unitary2x2::normalize_angle(-PI / 2.0), -PI / 2.0));
        assert_eq!(Unitary2x2::normalize_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_kron2_order() {
        let x = Unitary2x2::x().to_matrix();
        let id = Unitary2x2::identity().to_matrix();
        let m = kron2(&x, &id);
        // X on the most significant qubit maps |00> to |10>.
        assert_eq!(m[(2, 0)], ONE);
        assert_eq!(m[(1, 0)], ZERO);
    }

    #[test]
    fn test_two_qubit_matrices_are_unitary() {
        let theta = ParameterExpression::constant(0.7);
        let gates = [
            StandardGate::CX,
            StandardGate::CY,
            StandardGate::CH,
            StandardGate::ISwap,
            StandardGate::CRx(theta.clone()),
            StandardGate::CP(theta.clone()),
            StandardGate::RXX(theta.clone()),
            StandardGate::RYY(theta.clone()),
            StandardGate::RZX(theta),
        ];
        for gate in gates {
            let m = to_matrix4(&standard_gate_matrix(&gate).unwrap()).unwrap();
            assert!(unitarity_deviation(&m) < 1e-12, "{} not unitary", gate.name());
        }
    }

    #[test]
    fn test_cx_control_is_first_operand() {
        let m = standard_gate_matrix(&StandardGate::CX).unwrap();
        // |10> -> |11>
        assert_eq!(m[(3, 2)], ONE);
        assert_eq!(m[(2, 2)], ZERO);
    }

    #[test]
    fn test_rzx_definition() {
        let theta = 0.4;
        let m = standard_gate_matrix(&StandardGate::RZX(theta.into())).unwrap();
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        // Z on the control picks the sign of the X rotation on the target.
        assert!((m[(0, 1)] - Complex64::new(0.0, -s)).norm() < 1e-12);
        assert!((m[(2, 3)] - Complex64::new(0.0, s)).norm() < 1e-12);
        assert!((m[(0, 0)] - Complex64::new(c, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_symbolic_gate_has_no_matrix() {
        let gate = StandardGate::Rz(ParameterExpression::symbol("a"));
        assert!(standard_gate_matrix(&gate).is_none());
    }

    #[test]
    fn test_ccx_flips_target() {
        let m = standard_gate_matrix(&StandardGate::CCX).unwrap();
        assert_eq!(m[(7, 6)], ONE);
        assert_eq!(m[(5, 5)], ONE);
    }
}
