//! Weyl decomposition of consolidated unitaries into echoed CR gates.

use crisp_ir::{CircuitDag, Instruction, NodeIndex, QubitId, UNITARY_GATE_NAME};
use nalgebra::{DMatrix, Matrix4};
use num_complex::Complex64;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::{local_to_global, rebuild};
use crate::config::PipelineConfig;
use crate::error::{CompileError, CompileResult};
use crate::simulate::{deviation_up_to_phase, from_matrix4, instructions_unitary, phase_between};
use crate::unitary::{gate_matrix, to_matrix4};
use crate::weyl::{self, CrDirection};

const STAGE: &str = "echo_rzx_weyl_decomposition";

/// Native CR direction of the pair, from the backend's `cx` data.
fn cr_direction(config: &PipelineConfig, q0: QubitId, q1: QubitId) -> Option<CrDirection> {
    let map = config.instruction_map();
    if map.has_calibration("cx", &[q0.0, q1.0]) {
        Some(CrDirection::Forward)
    } else if map.has_calibration("cx", &[q1.0, q0.0]) {
        Some(CrDirection::Reversed)
    } else {
        None
    }
}

/// The 4x4 matrix and operands of a two-qubit `unitary` gate.
fn unitary_operand(inst: &Instruction) -> Option<(Matrix4<Complex64>, QubitId, QubitId)> {
    let gate = inst.as_gate()?;
    if gate.name() != UNITARY_GATE_NAME {
        return None;
    }
    let &[q0, q1] = inst.qubits.as_slice() else {
        return None;
    };
    let matrix = to_matrix4(&gate_matrix(gate)?)?;
    Some((matrix, q0, q1))
}

/// Replace every `unitary` gate by its Weyl decomposition, realized with
/// echoed `rzx` gates in the pair's native CR direction.
///
/// Unitaries on pairs the instruction map has no `cx` data for are left in
/// place and logged at warn level. A conditioned unitary becomes the same
/// recipe with the condition on every gate; its rewrite phase is dropped.
pub fn echo_rzx_weyl_decomposition(
    dag: CircuitDag,
    config: &PipelineConfig,
) -> CompileResult<CircuitDag> {
    let local = [QubitId(0), QubitId(1)];
    let mut replacements: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();
    let mut phase = dag.global_phase();

    for (node, inst) in dag.ops() {
        let Some((target, q0, q1)) = unitary_operand(inst) else {
            continue;
        };
        let Some(direction) = cr_direction(config, q0, q1) else {
            warn!("No cross-resonance data for ({}, {}); unitary left unresolved", q0, q1);
            continue;
        };

        let recipe = weyl::decompose(&target)?
            .with_atol(config.atol())
            .rzx_recipe_directed(config.echo_mode(), direction);

        let target = from_matrix4(&target);
        let composed: DMatrix<Complex64> = instructions_unitary(&recipe.instructions, &local)?;
        let deviation = deviation_up_to_phase(&target, &composed);
        if deviation > config.tolerance() {
            return Err(CompileError::NumericalToleranceExceeded {
                stage: STAGE.into(),
                deviation,
                tolerance: config.tolerance(),
            });
        }
        let condition = inst.as_gate().and_then(|g| g.condition.clone());
        if condition.is_none() {
            phase += phase_between(&target, &composed);
        }

        debug!(
            "Unitary on ({}, {}): {} CR gates, {:?} direction",
            q0,
            q1,
            recipe.num_cr_gates(),
            direction
        );
        let operands = [q0, q1];
        let to_global = local_to_global(&operands);
        let body = recipe
            .instructions
            .iter()
            .map(|member| {
                let mut member = member.remapped(&to_global);
                if let (Some(condition), Some(gate)) = (&condition, member.gate_mut()) {
                    gate.condition = Some(condition.clone());
                }
                member
            })
            .collect();
        replacements.insert(node, body);
    }

    rebuild(&dag, replacements, &FxHashSet::default(), phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BasisGates, EchoMode};
    use crate::simulate::{circuit_unitary, equivalent_up_to_phase};
    use crate::unitary::{row_major, standard_gate_matrix};
    use crisp_ir::{Circuit, ClassicalCondition, CustomGate, Gate, StandardGate};
    use crisp_pulse::InstructionMap;
    use std::sync::Arc;

    fn config(pairs: &[(u32, u32)]) -> PipelineConfig {
        PipelineConfig::new(BasisGates::ibm_cr(), Arc::new(InstructionMap::synthetic(3, pairs)))
    }

    fn unitary_circuit(gate: StandardGate, q0: u32, q1: u32) -> Circuit {
        let m = to_matrix4(&standard_gate_matrix(&gate).unwrap()).unwrap();
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.unitary(row_major(&m), QubitId(q0), QubitId(q1)).unwrap();
        circuit
    }

    fn rzx_gates(dag: &CircuitDag) -> Vec<(f64, Vec<QubitId>)> {
        dag.ops()
            .filter_map(|(_, inst)| match inst.as_standard() {
                Some(StandardGate::RZX(p)) => Some((p.as_f64().unwrap(), inst.qubits.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_cx_becomes_echoed_pair() {
        let circuit = unitary_circuit(StandardGate::CX, 0, 1);
        let before = circuit_unitary(circuit.dag()).unwrap();
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config(&[(0, 1)])).unwrap();

        let rzx = rzx_gates(&dag);
        assert_eq!(rzx.len(), 2);
        assert!((rzx[0].0 + rzx[1].0).abs() < 1e-12);
        assert!(rzx.iter().all(|(_, q)| q == &vec![QubitId(0), QubitId(1)]));
        assert!(dag.count_ops().get(UNITARY_GATE_NAME).is_none());

        let after = circuit_unitary(&dag).unwrap();
        assert!(equivalent_up_to_phase(&before, &after, 1e-9));
    }

    #[test]
    fn test_global_phase_is_tracked() {
        let circuit = unitary_circuit(StandardGate::ISwap, 0, 1);
        let before = circuit_unitary(circuit.dag()).unwrap();
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config(&[(0, 1)])).unwrap();
        let after = circuit_unitary(&dag).unwrap();
        let diff = (&before - &after).iter().map(|v| v.norm()).fold(0.0, f64::max);
        assert!(diff < 1e-9, "phase mismatch {diff}");
    }

    #[test]
    fn test_reversed_pair_uses_native_direction() {
        let circuit = unitary_circuit(StandardGate::CZ, 0, 1);
        let before = circuit_unitary(circuit.dag()).unwrap();
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config(&[(1, 0)])).unwrap();

        let rzx = rzx_gates(&dag);
        assert_eq!(rzx.len(), 2);
        assert!(rzx.iter().all(|(_, q)| q == &vec![QubitId(1), QubitId(0)]));
        assert!(equivalent_up_to_phase(&before, &circuit_unitary(&dag).unwrap(), 1e-9));
    }

    #[test]
    fn test_pulse_mode_emits_one_rzx_per_term() {
        let circuit = unitary_circuit(StandardGate::Swap, 1, 2);
        let before = circuit_unitary(circuit.dag()).unwrap();
        let config = config(&[(1, 2)]).with_echo_mode(EchoMode::Pulse);
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config).unwrap();
        assert_eq!(rzx_gates(&dag).len(), 3);
        assert!(equivalent_up_to_phase(&before, &circuit_unitary(&dag).unwrap(), 1e-9));
    }

    #[test]
    fn test_pair_without_data_is_left_alone() {
        let circuit = unitary_circuit(StandardGate::CX, 0, 2);
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config(&[(0, 1)])).unwrap();
        assert_eq!(dag.count_ops().get(UNITARY_GATE_NAME), Some(&1));
        assert!(rzx_gates(&dag).is_empty());
    }

    #[test]
    fn test_conditioned_unitary_is_decomposed_under_condition() {
        let m = to_matrix4(&standard_gate_matrix(&StandardGate::CX).unwrap()).unwrap();
        let condition = ClassicalCondition::new("c", 1);
        let gate = Gate::custom(CustomGate::unitary(row_major(&m)).unwrap())
            .with_condition(condition.clone());
        let mut dag = Circuit::with_size("t", 3, 1).into_dag();
        dag.apply(Instruction::gate(gate, [QubitId(0), QubitId(1)])).unwrap();
        let phase = dag.global_phase();

        let dag = echo_rzx_weyl_decomposition(dag, &config(&[(0, 1)])).unwrap();

        assert!(dag.count_ops().get(UNITARY_GATE_NAME).is_none());
        assert_eq!(rzx_gates(&dag).len(), 2);
        for (_, inst) in dag.ops() {
            assert_eq!(inst.as_gate().unwrap().condition.as_ref(), Some(&condition));
        }
        assert_eq!(dag.global_phase(), phase);
    }

    #[test]
    fn test_local_unitary_has_no_cr() {
        let h = standard_gate_matrix(&StandardGate::H).unwrap();
        let m = to_matrix4(&h.kronecker(&h)).unwrap();
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.unitary(row_major(&m), QubitId(0), QubitId(1)).unwrap();
        let dag = echo_rzx_weyl_decomposition(circuit.into_dag(), &config(&[(0, 1)])).unwrap();
        assert!(rzx_gates(&dag).is_empty());
        assert!(dag.ops().all(|(_, inst)| inst.qubits.len() == 1));
    }
}
