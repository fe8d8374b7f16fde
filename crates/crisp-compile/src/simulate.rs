//! Dense unitary simulation for small circuits.
//!
//! Used by the stages to check their own rewrites and by tests to compare a
//! compiled circuit with its input. Qubit `k` of `n` sits at bit `n - 1 - k`
//! of a basis index, so the first qubit is the most significant.

use crisp_ir::{CircuitDag, Instruction, InstructionKind, QubitId};
use nalgebra::{DMatrix, Matrix4};
use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};
use crate::unitary::gate_matrix;

/// Widest circuit [`circuit_unitary`] accepts.
pub const MAX_SIMULATION_QUBITS: usize = 10;

/// Left-multiply `u` by `gate` acting on `positions`.
fn apply_in_place(
    u: &mut DMatrix<Complex64>,
    gate: &DMatrix<Complex64>,
    positions: &[usize],
    num_qubits: usize,
) {
    let k = positions.len();
    let sub_dim = 1usize << k;
    let masks: Vec<usize> = positions
        .iter()
        .map(|&q| 1usize << (num_qubits - 1 - q))
        .collect();
    let all = masks.iter().fold(0, |acc, m| acc | m);
    let offsets: Vec<usize> = (0..sub_dim)
        .map(|r| {
            masks
                .iter()
                .enumerate()
                .filter(|(i, _)| (r >> (k - 1 - i)) & 1 == 1)
                .fold(0, |acc, (_, m)| acc | m)
        })
        .collect();

    let dim = u.nrows();
    let mut gathered = vec![Complex64::new(0.0, 0.0); sub_dim];
    for base in (0..dim).filter(|b| b & all == 0) {
        for col in 0..u.ncols() {
            for (r, offset) in offsets.iter().enumerate() {
                gathered[r] = u[(base | offset, col)];
            }
            for (r, offset) in offsets.iter().enumerate() {
                u[(base | offset, col)] = (0..sub_dim).map(|s| gate[(r, s)] * gathered[s]).sum();
            }
        }
    }
}

/// Unitary of `instructions` over `qubits`, in temporal order.
///
/// Barriers and delays act as identity. Measurements, resets, conditioned
/// gates and gates without a matrix are rejected.
pub fn instructions_unitary<'a>(
    instructions: impl IntoIterator<Item = &'a Instruction>,
    qubits: &[QubitId],
) -> CompileResult<DMatrix<Complex64>> {
    let n = qubits.len();
    if n > MAX_SIMULATION_QUBITS {
        return Err(CompileError::TooLargeToSimulate {
            num_qubits: n,
            max: MAX_SIMULATION_QUBITS,
        });
    }
    let position: FxHashMap<QubitId, usize> =
        qubits.iter().enumerate().map(|(i, &q)| (q, i)).collect();
    let mut u = DMatrix::<Complex64>::identity(1 << n, 1 << n);

    for inst in instructions {
        let gate = match &inst.kind {
            InstructionKind::Barrier | InstructionKind::Delay { .. } => continue,
            InstructionKind::Gate(gate) if gate.condition.is_none() => gate,
            _ => return Err(CompileError::NonUnitary(inst.name().to_string())),
        };
        let matrix =
            gate_matrix(gate).ok_or_else(|| CompileError::NonUnitary(inst.name().to_string()))?;
        let positions = inst
            .qubits
            .iter()
            .map(|q| {
                position.get(q).copied().ok_or_else(|| {
                    CompileError::Ir(crisp_ir::IrError::QubitNotFound {
                        qubit: *q,
                        gate_name: Some(inst.name().to_string()),
                    })
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        apply_in_place(&mut u, &matrix, &positions, n);
    }
    Ok(u)
}

/// Unitary of a whole circuit, including its global phase.
pub fn circuit_unitary(dag: &CircuitDag) -> CompileResult<DMatrix<Complex64>> {
    let u = instructions_unitary(dag.ops().map(|(_, inst)| inst), &dag.qubits())?;
    let phase = Complex64::from_polar(1.0, dag.global_phase());
    Ok(u.map(|v| v * phase))
}

/// Phase `phi` minimizing `|a - e^{i phi} b|`.
pub fn phase_between(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>) -> f64 {
    let overlap: Complex64 = a.iter().zip(b.iter()).map(|(x, y)| y.conj() * x).sum();
    overlap.arg()
}

/// Largest entry of `a - e^{i phi} b` for the best phase `phi`.
///
/// Matrices of different shape are infinitely far apart.
pub fn deviation_up_to_phase(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    let phase = Complex64::from_polar(1.0, phase_between(a, b));
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y * phase).norm())
        .fold(0.0, f64::max)
}

/// Whether `a` equals `b` up to a global phase.
pub fn equivalent_up_to_phase(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>, tol: f64) -> bool {
    deviation_up_to_phase(a, b) <= tol
}

/// Widen a fixed 4x4 matrix.
pub fn from_matrix4(m: &Matrix4<Complex64>) -> DMatrix<Complex64> {
    DMatrix::from_fn(4, 4, |r, c| m[(r, c)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unitary::standard_gate_matrix;
    use crisp_ir::{Circuit, ClbitId, StandardGate};
    use std::f64::consts::PI;

    #[test]
    fn test_bell_unitary_first_column() {
        let circuit = Circuit::ghz(2).unwrap();
        let u = circuit_unitary(circuit.dag()).unwrap();
        let s = 1.0 / 2.0_f64.sqrt();
        assert!((u[(0, 0)].re - s).abs() < 1e-12);
        assert!((u[(3, 0)].re - s).abs() < 1e-12);
        assert!(u[(1, 0)].norm() < 1e-12);
    }

    #[test]
    fn test_operand_order_matters() {
        let q = [QubitId(0), QubitId(1)];
        let forward = [Instruction::two_qubit_gate(StandardGate::CX, q[0], q[1])];
        let reverse = [Instruction::two_qubit_gate(StandardGate::CX, q[1], q[0])];
        let a = instructions_unitary(&forward, &q).unwrap();
        let b = instructions_unitary(&reverse, &q).unwrap();
        assert_eq!(a, standard_gate_matrix(&StandardGate::CX).unwrap());
        assert!(!equivalent_up_to_phase(&a, &b, 1e-6));
    }

    #[test]
    fn test_h_cz_h_is_cx() {
        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit
            .h(QubitId(1))
            .unwrap()
            .cz(QubitId(0), QubitId(1))
            .unwrap()
            .h(QubitId(1))
            .unwrap();
        let u = circuit_unitary(circuit.dag()).unwrap();
        let cx = standard_gate_matrix(&StandardGate::CX).unwrap();
        assert!(equivalent_up_to_phase(&u, &cx, 1e-12));
    }

    #[test]
    fn test_phase_between() {
        let z = standard_gate_matrix(&StandardGate::Z).unwrap();
        let rz = standard_gate_matrix(&StandardGate::Rz(PI.into())).unwrap();
        // Rz(pi) = -i Z
        let phase = phase_between(&rz, &z);
        assert!((phase + PI / 2.0).abs() < 1e-12);
        assert!(deviation_up_to_phase(&rz, &z) < 1e-12);
    }

    #[test]
    fn test_global_phase_included() {
        let mut dag = Circuit::with_size("p", 1, 0).into_dag();
        dag.set_global_phase(PI);
        let u = circuit_unitary(&dag).unwrap();
        assert!((u[(0, 0)].re + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_measurement_not_unitary() {
        let mut circuit = Circuit::with_size("m", 1, 1);
        circuit.h(QubitId(0)).unwrap().measure(QubitId(0), ClbitId(0)).unwrap();
        assert!(matches!(
            circuit_unitary(circuit.dag()),
            Err(CompileError::NonUnitary(name)) if name == "measure"
        ));
    }

    #[test]
    fn test_barrier_is_identity() {
        let mut circuit = Circuit::with_size("b", 2, 0);
        circuit.barrier([QubitId(0), QubitId(1)]).unwrap();
        let u = circuit_unitary(circuit.dag()).unwrap();
        assert_eq!(u, DMatrix::identity(4, 4));
    }

    #[test]
    fn test_three_qubit_embedding() {
        let q = [QubitId(0), QubitId(1), QubitId(2)];
        let ops = [Instruction::two_qubit_gate(StandardGate::CX, q[0], q[2])];
        let u = instructions_unitary(&ops, &q).unwrap();
        // |100> -> |101>
        assert_eq!(u[(5, 4)], Complex64::new(1.0, 0.0));
        assert_eq!(u[(2, 2)], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_too_wide() {
        let qubits: Vec<_> = (0..11).map(QubitId).collect();
        assert!(matches!(
            instructions_unitary(&[], &qubits),
            Err(CompileError::TooLargeToSimulate { .. })
        ));
    }
}
