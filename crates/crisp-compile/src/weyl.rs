//! Weyl (KAK) decomposition of two-qubit unitaries.
//!
//! Every two-qubit unitary factors as
//!
//! ```text
//! U = e^{i phase} (K1l ⊗ K1r) Ud(a, b, c) (K2l ⊗ K2r)
//! Ud(a, b, c) = exp(i (a XX + b YY + c ZZ))
//! ```
//!
//! with single-qubit `K` factors and coordinates in the Weyl chamber
//! `pi/4 >= a >= b >= |c|`. The factorization works in the magic basis,
//! where local gates become real orthogonal matrices, and diagonalizes the
//! complex symmetric matrix `M2 = Up^T Up` with a randomized real
//! eigendecomposition.
//!
//! [`WeylDecomposition::rzx_recipe`] turns the factorization into a circuit
//! whose only entangling gates are cross-resonance rotations `rzx`:
//!
//! ```text
//! exp(i a XX) = H(c) RZX(-2a) H(c)
//! exp(i b YY) = Sdg(c) H(c) Sdg(t) RZX(-2b) H(c) S(c) S(t)
//! exp(i c ZZ) = H(t) RZX(-2c) H(t)
//! ```
//!
//! # Example
//!
//! ```
//! use crisp_compile::weyl;
//! use crisp_compile::unitary::{standard_gate_matrix, to_matrix4};
//! use crisp_compile::EchoMode;
//! use crisp_ir::StandardGate;
//!
//! let cx = to_matrix4(&standard_gate_matrix(&StandardGate::CX).unwrap()).unwrap();
//! let decomposition = weyl::decompose(&cx).unwrap();
//! let coords = decomposition.coordinates;
//! assert!((coords.a - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
//! assert!(coords.b.abs() < 1e-9 && coords.c.abs() < 1e-9);
//!
//! // One interaction term, echoed: two CR gates.
//! let recipe = decomposition.rzx_recipe(EchoMode::Gate);
//! assert_eq!(recipe.num_cr_gates(), 2);
//! ```

use std::fmt;

use crisp_ir::{Instruction, QubitId, StandardGate};
use nalgebra::{Matrix2, Matrix4, Vector4};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{DEFAULT_ATOL, EchoMode};
use crate::error::{CompileError, CompileResult};
use crate::unitary::{Unitary2x2, kron2};

const PI: f64 = std::f64::consts::PI;
const PI2: f64 = PI / 2.0;
const PI4: f64 = PI / 4.0;
const PI32: f64 = 3.0 * PI2;
const TWO_PI: f64 = 2.0 * PI;

const C0: Complex64 = Complex64::new(0.0, 0.0);
const C1: Complex64 = Complex64::new(1.0, 0.0);
const CI: Complex64 = Complex64::new(0.0, 1.0);

/// Accuracy the eigendecomposition of `M2` must reach.
const DIAGONALIZATION_TOLERANCE: f64 = 1e-12;

/// Attempts at diagonalizing `M2` before giving up.
const DIAGONALIZATION_TRIALS: usize = 100;

const STAGE: &str = "weyl_decomposition";

/// Non-normalized magic basis; its inverse is [`magic_dagger`].
fn magic() -> Matrix4<Complex64> {
    Matrix4::new(
        C1, CI, C0, C0, //
        C0, C0, CI, C1, //
        C0, C0, CI, -C1, //
        C1, -CI, C0, C0,
    )
}

fn magic_dagger() -> Matrix4<Complex64> {
    let h = Complex64::new(0.5, 0.0);
    let hi = Complex64::new(0.0, 0.5);
    Matrix4::new(
        h, C0, C0, h, //
        -hi, C0, C0, hi, //
        C0, -hi, -hi, C0, //
        C0, h, -h, C0,
    )
}

fn transform_from_magic_basis(u: &Matrix4<Complex64>, reverse: bool) -> Matrix4<Complex64> {
    if reverse {
        magic_dagger() * u * magic()
    } else {
        magic() * u * magic_dagger()
    }
}

fn det2(m: &Matrix2<Complex64>) -> Complex64 {
    m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
}

/// `i Z`
fn ipz() -> Matrix2<Complex64> {
    Matrix2::new(CI, C0, C0, -CI)
}

/// `i Y`
fn ipy() -> Matrix2<Complex64> {
    Matrix2::new(C0, C1, -C1, C0)
}

/// `i X`
fn ipx() -> Matrix2<Complex64> {
    Matrix2::new(C0, CI, CI, C0)
}

/// Coordinates of a two-qubit unitary in the Weyl chamber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeylCoordinates {
    /// `XX` coefficient.
    pub a: f64,
    /// `YY` coefficient.
    pub b: f64,
    /// `ZZ` coefficient.
    pub c: f64,
}

impl WeylCoordinates {
    /// Coordinates with entries of magnitude at most `atol` set to zero.
    #[must_use]
    pub fn snapped(&self, atol: f64) -> Self {
        let snap = |x: f64| if x.abs() <= atol { 0.0 } else { x };
        Self {
            a: snap(self.a),
            b: snap(self.b),
            c: snap(self.c),
        }
    }

    /// Number of coordinates above `atol`, i.e. interaction terms to realize.
    pub fn num_interactions(&self, atol: f64) -> usize {
        [self.a, self.b, self.c]
            .iter()
            .filter(|x| x.abs() > atol)
            .count()
    }
}

impl fmt::Display for WeylCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.a, self.b, self.c)
    }
}

/// Direction of a pair relative to the backend's native CR direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrDirection {
    /// First operand is the native control.
    Forward,
    /// Second operand is the native control.
    Reversed,
}

/// Result of [`decompose`].
#[derive(Debug, Clone)]
pub struct WeylDecomposition {
    /// Chamber coordinates.
    pub coordinates: WeylCoordinates,
    /// Global phase of the factorization.
    pub global_phase: f64,
    /// Left factor after the interaction, on the first qubit.
    pub k1l: Matrix2<Complex64>,
    /// Left factor after the interaction, on the second qubit.
    pub k1r: Matrix2<Complex64>,
    /// Right factor before the interaction, on the first qubit.
    pub k2l: Matrix2<Complex64>,
    /// Right factor before the interaction, on the second qubit.
    pub k2r: Matrix2<Complex64>,
    atol: f64,
}

/// A circuit on local qubits 0 and 1 realizing a decomposition.
///
/// `e^{i global_phase}` times the circuit's unitary equals the decomposed
/// matrix.
#[derive(Debug, Clone, Default)]
pub struct RzxRecipe {
    /// Gates in temporal order on `QubitId(0)` and `QubitId(1)`.
    pub instructions: Vec<Instruction>,
    /// Phase not carried by the gates.
    pub global_phase: f64,
}

impl RzxRecipe {
    /// Number of `rzx` gates in the recipe.
    pub fn num_cr_gates(&self) -> usize {
        self.instructions
            .iter()
            .filter(|inst| matches!(inst.as_standard(), Some(StandardGate::RZX(_))))
            .count()
    }

    fn gate(&mut self, gate: StandardGate, qubit: u32) {
        self.instructions
            .push(Instruction::single_qubit_gate(gate, QubitId(qubit)));
    }

    fn rzx(&mut self, theta: f64, control: u32, target: u32) {
        self.instructions.push(Instruction::two_qubit_gate(
            StandardGate::RZX(theta.into()),
            QubitId(control),
            QubitId(target),
        ));
    }

    fn local(&mut self, k: &Matrix2<Complex64>, qubit: u32) {
        let u = Unitary2x2::from_matrix(k);
        if u.is_identity() {
            self.global_phase += u.data[0].arg();
            return;
        }
        let (theta, phi, lambda, phase) = u.u_decomposition();
        self.global_phase += phase;
        self.gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            qubit,
        );
    }

    fn cross_resonance(&mut self, theta: f64, mode: EchoMode, direction: CrDirection) {
        let (control, target) = match direction {
            CrDirection::Forward => (0, 1),
            CrDirection::Reversed => (1, 0),
        };
        if direction == CrDirection::Reversed {
            self.gate(StandardGate::H, 0);
            self.gate(StandardGate::H, 1);
        }
        match mode {
            EchoMode::Gate => {
                self.rzx(theta / 2.0, control, target);
                self.gate(StandardGate::X, control);
                self.rzx(-theta / 2.0, control, target);
                self.gate(StandardGate::X, control);
            }
            EchoMode::Pulse => self.rzx(theta, control, target),
        }
        if direction == CrDirection::Reversed {
            self.gate(StandardGate::H, 0);
            self.gate(StandardGate::H, 1);
        }
    }
}

impl WeylDecomposition {
    /// Override the cutoff below which a coordinate counts as zero.
    #[must_use]
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Rebuild the decomposed matrix from the factors.
    pub fn unitary(&self) -> Matrix4<Complex64> {
        let WeylCoordinates { a, b, c } = self.coordinates;
        let x = Unitary2x2::x().to_matrix();
        let y = Unitary2x2::y().to_matrix();
        let z = Unitary2x2::z().to_matrix();
        let exp_i = |p: &Matrix2<Complex64>, angle: f64| {
            Matrix4::identity().map(|v: Complex64| v * angle.cos())
                + kron2(p, p).map(|v| v * CI * angle.sin())
        };
        let ud = exp_i(&x, a) * exp_i(&y, b) * exp_i(&z, c);
        let phase = Complex64::from_polar(1.0, self.global_phase);
        (kron2(&self.k1l, &self.k1r) * ud * kron2(&self.k2l, &self.k2r)).map(|v| v * phase)
    }

    /// Circuit with the native direction on the first operand.
    pub fn rzx_recipe(&self, mode: EchoMode) -> RzxRecipe {
        self.rzx_recipe_directed(mode, CrDirection::Forward)
    }

    /// Circuit whose `rzx` gates all run in the given native direction.
    ///
    /// Interaction terms with a zero coordinate are omitted, so a unitary
    /// with one nonzero coordinate yields a single CR term.
    pub fn rzx_recipe_directed(&self, mode: EchoMode, direction: CrDirection) -> RzxRecipe {
        let WeylCoordinates { a, b, c } = self.coordinates.snapped(self.atol);
        let mut recipe = RzxRecipe {
            instructions: vec![],
            global_phase: self.global_phase,
        };

        recipe.local(&self.k2l, 0);
        recipe.local(&self.k2r, 1);

        if a != 0.0 {
            recipe.gate(StandardGate::H, 0);
            recipe.cross_resonance(-2.0 * a, mode, direction);
            recipe.gate(StandardGate::H, 0);
        }
        if b != 0.0 {
            recipe.gate(StandardGate::Sdg, 0);
            recipe.gate(StandardGate::H, 0);
            recipe.gate(StandardGate::Sdg, 1);
            recipe.cross_resonance(-2.0 * b, mode, direction);
            recipe.gate(StandardGate::H, 0);
            recipe.gate(StandardGate::S, 0);
            recipe.gate(StandardGate::S, 1);
        }
        if c != 0.0 {
            recipe.gate(StandardGate::H, 1);
            recipe.cross_resonance(-2.0 * c, mode, direction);
            recipe.gate(StandardGate::H, 1);
        }

        recipe.local(&self.k1l, 0);
        recipe.local(&self.k1r, 1);
        recipe
    }
}

/// Split a 4x4 tensor product `L ⊗ R` into `(L, R, phase)` with `L`, `R` in
/// SU(2).
fn decompose_product_gate(
    k: &Matrix4<Complex64>,
) -> CompileResult<(Matrix2<Complex64>, Matrix2<Complex64>, f64)> {
    let mut r = Matrix2::new(k[(0, 0)], k[(0, 1)], k[(1, 0)], k[(1, 1)]);
    let mut det_r = det2(&r);
    if det_r.norm() < 0.1 {
        r = Matrix2::new(k[(2, 0)], k[(2, 1)], k[(3, 0)], k[(3, 1)]);
        det_r = det2(&r);
    }
    if det_r.norm() < 0.1 {
        return Err(CompileError::NumericalToleranceExceeded {
            stage: STAGE.into(),
            deviation: 1.0 - det_r.norm(),
            tolerance: 0.9,
        });
    }
    let scale = det_r.sqrt();
    r = r.map(|v| v / scale);

    let temp = k * kron2(&Matrix2::identity(), &r.adjoint());
    let mut l = Matrix2::new(temp[(0, 0)], temp[(0, 2)], temp[(2, 0)], temp[(2, 2)]);
    let det_l = det2(&l);
    if det_l.norm() < 0.9 {
        return Err(CompileError::NumericalToleranceExceeded {
            stage: STAGE.into(),
            deviation: 1.0 - det_l.norm(),
            tolerance: 0.1,
        });
    }
    let scale = det_l.sqrt();
    l = l.map(|v| v / scale);
    Ok((l, r, det_l.arg() / 2.0))
}

/// Find a real orthogonal `P` with `P^T M2 P` diagonal.
///
/// The real and imaginary parts of `M2` commute, so a random real
/// combination of them shares their eigenvectors unless its spectrum is
/// degenerate by accident; a few retries make that vanishingly unlikely.
fn diagonalize_symmetric(
    m2: &Matrix4<Complex64>,
) -> CompileResult<(Matrix4<f64>, Vector4<Complex64>)> {
    let mut rng = StdRng::seed_from_u64(2023);
    let mut best = f64::INFINITY;
    for trial in 0..DIAGONALIZATION_TRIALS {
        let (rand_a, rand_b) = if trial == 0 {
            (1.2602066112249388, 0.22317849046722027)
        } else {
            (rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        };
        let m2_real = m2.map(|v| rand_a * v.re + rand_b * v.im);
        let p = m2_real.symmetric_eigen().eigenvectors;
        let pc = p.map(|v| Complex64::new(v, 0.0));
        let d = (pc.transpose() * m2 * pc).diagonal();
        let compare = pc * Matrix4::from_diagonal(&d) * pc.transpose();
        let deviation = (compare - m2)
            .iter()
            .map(|v| v.norm())
            .fold(0.0, f64::max);
        if deviation <= DIAGONALIZATION_TOLERANCE {
            return Ok((p, d));
        }
        best = best.min(deviation);
    }
    Err(CompileError::NumericalToleranceExceeded {
        stage: STAGE.into(),
        deviation: best,
        tolerance: DIAGONALIZATION_TOLERANCE,
    })
}

fn arg_sort(data: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..data.len()).collect();
    indices.sort_by(|&a, &b| data[a].total_cmp(&data[b]));
    indices
}

/// Weyl decomposition of a two-qubit unitary.
pub fn decompose(unitary: &Matrix4<Complex64>) -> CompileResult<WeylDecomposition> {
    // Adding zero turns a negative-zero imaginary part positive, which keeps
    // the fourth root on the principal branch.
    let det_u = unitary.determinant() + C0;
    let det_pow = det_u.powf(-0.25);
    let u = unitary.map(|v| v * det_pow);
    let mut global_phase = det_u.arg() / 4.0;
    let u_p = transform_from_magic_basis(&u, true);
    let m2 = u_p.transpose() * u_p;

    let (p, d_raw) = diagonalize_symmetric(&m2)?;

    let mut d: [f64; 4] = std::array::from_fn(|i| -d_raw[i].arg() / 2.0);
    d[3] = -d[0] - d[1] - d[2];
    let cs: [f64; 3] = std::array::from_fn(|i| ((d[i] + d[3]) / 2.0).rem_euclid(TWO_PI));
    let cstemp: Vec<f64> = cs
        .iter()
        .map(|x| x.rem_euclid(PI2))
        .map(|x| x.min(PI2 - x))
        .collect();
    let mut order = arg_sort(&cstemp);
    (order[0], order[1], order[2]) = (order[1], order[2], order[0]);
    let mut cs = [cs[order[0]], cs[order[1]], cs[order[2]]];
    let d = [d[order[0]], d[order[1]], d[order[2]], d[3]];

    let mut p = Matrix4::from_fn(|r, c| if c < 3 { p[(r, order[c])] } else { p[(r, 3)] });
    if p.determinant() < 0.0 {
        for r in 0..4 {
            p[(r, 3)] = -p[(r, 3)];
        }
    }
    let pc = p.map(|v| Complex64::new(v, 0.0));
    let phases = Matrix4::from_diagonal(&Vector4::from_fn(|i, _| (CI * d[i]).exp()));
    let k1 = transform_from_magic_basis(&(u_p * pc * phases), false);
    let k2 = transform_from_magic_basis(&pc.transpose(), false);

    let (mut k1l, mut k1r, phase_l) = decompose_product_gate(&k1)?;
    let (k2l, mut k2r, phase_r) = decompose_product_gate(&k2)?;
    global_phase += phase_l + phase_r;

    // Flip into the Weyl chamber.
    if cs[0] > PI2 {
        cs[0] -= PI32;
        k1l *= ipy();
        k1r *= ipy();
        global_phase += PI2;
    }
    if cs[1] > PI2 {
        cs[1] -= PI32;
        k1l *= ipx();
        k1r *= ipx();
        global_phase += PI2;
    }
    let mut conjs = 0;
    if cs[0] > PI4 {
        cs[0] = PI2 - cs[0];
        k1l *= ipy();
        k2r = ipy() * k2r;
        conjs += 1;
        global_phase -= PI2;
    }
    if cs[1] > PI4 {
        cs[1] = PI2 - cs[1];
        k1l *= ipx();
        k2r = ipx() * k2r;
        conjs += 1;
        global_phase += PI2;
        if conjs == 1 {
            global_phase -= PI;
        }
    }
    if cs[2] > PI2 {
        cs[2] -= PI32;
        k1l *= ipz();
        k1r *= ipz();
        global_phase += PI2;
        if conjs == 1 {
            global_phase -= PI;
        }
    }
    if conjs == 1 {
        cs[2] = PI2 - cs[2];
        k1l *= ipz();
        k2r = ipz() * k2r;
        global_phase += PI2;
    }
    if cs[2] > PI4 {
        cs[2] -= PI2;
        k1l *= ipz();
        k1r *= ipz();
        global_phase -= PI2;
    }

    Ok(WeylDecomposition {
        coordinates: WeylCoordinates {
            a: cs[1],
            b: cs[0],
            c: cs[2],
        },
        global_phase,
        k1l,
        k1r,
        k2l,
        k2r,
        atol: DEFAULT_ATOL,
    })
}
