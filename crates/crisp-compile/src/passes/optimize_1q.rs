//! Single-qubit run re-synthesis.

use crisp_ir::{CircuitDag, Instruction, NodeIndex, QubitId};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::rebuild;
use crate::config::{BasisGates, PipelineConfig};
use crate::error::{CompileError, CompileResult};
use crate::euler::{EulerBasis, synthesize_best};
use crate::simulate::{deviation_up_to_phase, phase_between};
use crate::unitary::{Unitary2x2, gate_matrix, standard_gate_matrix};

const STAGE: &str = "optimize_1q_decomposition";

/// Matrix of an unconditioned single-qubit gate.
fn run_member(inst: &Instruction) -> Option<(QubitId, DMatrix<Complex64>)> {
    let gate = inst.as_gate()?;
    if gate.condition.is_some() {
        return None;
    }
    let &[q] = inst.qubits.as_slice() else {
        return None;
    };
    Some((q, gate_matrix(gate)?))
}

struct Run {
    qubit: QubitId,
    nodes: Vec<NodeIndex>,
    unitary: DMatrix<Complex64>,
    foreign: bool,
}

/// Maximal runs of matrix-backed single-qubit gates, per wire.
fn collect_runs(dag: &CircuitDag, basis: &BasisGates) -> Vec<Run> {
    let mut open: FxHashMap<QubitId, Run> = FxHashMap::default();
    let mut runs = Vec::new();

    for (node, inst) in dag.ops() {
        match run_member(inst) {
            Some((q, matrix)) => {
                let run = open.entry(q).or_insert_with(|| Run {
                    qubit: q,
                    nodes: vec![],
                    unitary: DMatrix::identity(2, 2),
                    foreign: false,
                });
                run.nodes.push(node);
                run.unitary = matrix * &run.unitary;
                run.foreign |= !basis.contains(inst.name());
            }
            None => runs.extend(inst.qubits.iter().filter_map(|q| open.remove(q))),
        }
    }
    runs.extend(open.into_values());
    runs
}

/// Re-synthesize runs of single-qubit gates in the cheapest Euler basis the
/// target supports.
///
/// A run is replaced when the new sequence is shorter or the run holds a gate
/// outside the basis. The new gates take the place of the run's last gate.
pub fn optimize_1q_decomposition(
    dag: CircuitDag,
    config: &PipelineConfig,
) -> CompileResult<CircuitDag> {
    let basis = config.augmented_basis();
    let bases = EulerBasis::supported_by(&basis);
    if bases.is_empty() {
        debug!("No Euler basis inside [{}]; skipping", basis);
        return Ok(dag);
    }

    let mut replacements: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();
    let mut removed: FxHashSet<NodeIndex> = FxHashSet::default();
    let mut phase = dag.global_phase();

    for run in collect_runs(&dag, &basis) {
        let Some(&last) = run.nodes.last() else {
            continue;
        };
        let u = &run.unitary;
        let target = Unitary2x2::new(u[(0, 0)], u[(0, 1)], u[(1, 0)], u[(1, 1)]);
        let Some((euler, gates)) = synthesize_best(&target, &bases, config.atol()) else {
            continue;
        };
        if gates.len() >= run.nodes.len() && !run.foreign {
            continue;
        }

        let composed = gates.iter().try_fold(DMatrix::identity(2, 2), |acc, g| {
            standard_gate_matrix(g).map(|m| m * acc)
        });
        let composed = composed.ok_or_else(|| CompileError::NonUnitary(euler.to_string()))?;
        let deviation = deviation_up_to_phase(u, &composed);
        if deviation > config.tolerance() {
            return Err(CompileError::NumericalToleranceExceeded {
                stage: STAGE.into(),
                deviation,
                tolerance: config.tolerance(),
            });
        }
        phase += phase_between(u, &composed);

        let qubit = run.qubit;
        debug!(
            "{}: {} gates -> {} in {}",
            qubit,
            run.nodes.len(),
            gates.len(),
            euler
        );
        let body = gates
            .into_iter()
            .map(|g| Instruction::single_qubit_gate(g, qubit))
            .collect();
        replacements.insert(last, body);
        removed.extend(run.nodes.iter().copied());
    }

    rebuild(&dag, replacements, &removed, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::circuit_unitary;
    use crisp_ir::{Circuit, ClassicalCondition, Gate, StandardGate};
    use crisp_pulse::InstructionMap;
    use std::sync::Arc;

    fn config(basis: BasisGates) -> PipelineConfig {
        PipelineConfig::new(basis, Arc::new(InstructionMap::synthetic(2, &[])))
    }

    fn max_diff(a: &CircuitDag, b: &CircuitDag) -> f64 {
        let a = circuit_unitary(a).unwrap();
        let b = circuit_unitary(b).unwrap();
        (&a - &b).iter().map(|v| v.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_long_run_collapses() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit
            .rz(0.3, QubitId(0))
            .unwrap()
            .sx(QubitId(0))
            .unwrap()
            .rz(0.2, QubitId(0))
            .unwrap()
            .sx(QubitId(0))
            .unwrap()
            .rz(-0.4, QubitId(0))
            .unwrap()
            .sx(QubitId(0))
            .unwrap()
            .rz(1.0, QubitId(0))
            .unwrap();
        let dag = optimize_1q_decomposition(circuit.dag().clone(), &config(BasisGates::ibm_cr()))
            .unwrap();
        assert!(dag.num_ops() <= 5);
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_inverse_pair_vanishes() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.sx(QubitId(0)).unwrap().sxdg(QubitId(0)).unwrap();
        let dag = optimize_1q_decomposition(circuit.into_dag(), &config(BasisGates::ibm_cr()))
            .unwrap();
        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_foreign_gate_is_replaced_even_if_not_shorter() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let dag = optimize_1q_decomposition(circuit.dag().clone(), &config(BasisGates::ibm_cr()))
            .unwrap();
        assert!(dag.ops().all(|(_, i)| ["rz", "sx", "x"].contains(&i.name())));
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_short_native_run_is_kept() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.rz(0.3, QubitId(0)).unwrap().sx(QubitId(0)).unwrap();
        let dag = optimize_1q_decomposition(circuit.dag().clone(), &config(BasisGates::ibm_cr()))
            .unwrap();
        let names: Vec<_> = dag.ops().map(|(_, i)| i.name().to_string()).collect();
        assert_eq!(names, vec!["rz", "sx"]);
    }

    #[test]
    fn test_runs_stop_at_two_qubit_gates() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .x(QubitId(0))
            .unwrap()
            .x(QubitId(0))
            .unwrap();
        let dag = optimize_1q_decomposition(circuit.dag().clone(), &config(BasisGates::ibm_cr()))
            .unwrap();
        let names: Vec<_> = dag.ops().map(|(_, i)| i.name().to_string()).collect();
        assert_eq!(names, vec!["cx"]);
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_conditioned_gate_splits_run() {
        let mut circuit = Circuit::with_size("t", 1, 1);
        let conditioned =
            Gate::standard(StandardGate::X).with_condition(ClassicalCondition::new("c", 1));
        circuit
            .x(QubitId(0))
            .unwrap()
            .gate(conditioned, [QubitId(0)])
            .unwrap()
            .x(QubitId(0))
            .unwrap();
        let dag = optimize_1q_decomposition(circuit.into_dag(), &config(BasisGates::ibm_cr()))
            .unwrap();
        assert_eq!(dag.num_ops(), 3);
    }

    #[test]
    fn test_u_basis() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.h(QubitId(0)).unwrap().t(QubitId(0)).unwrap();
        let dag = optimize_1q_decomposition(
            circuit.dag().clone(),
            &config(BasisGates::new(["u", "cx"])),
        )
        .unwrap();
        let names: Vec<_> = dag.ops().map(|(_, i)| i.name().to_string()).collect();
        assert_eq!(names, vec!["u"]);
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }
}
