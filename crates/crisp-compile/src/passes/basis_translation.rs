//! Translation into the target basis.

use crisp_ir::{
    CircuitDag, ClassicalCondition, Gate, GateKind, Instruction, NodeIndex, ParameterExpression,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{local_to_global, rebuild};
use crate::config::{BasisGates, PipelineConfig};
use crate::equivalence::{EquivalenceLibrary, TranslationPlan};
use crate::error::{CompileError, CompileResult};
use crate::euler::{EulerBasis, synthesize_best};
use crate::simulate::{deviation_up_to_phase, instructions_unitary, phase_between};
use crate::unitary::{Unitary2x2, gate_matrix};

const STAGE: &str = "basis_translation";

fn is_native(inst: &Instruction, basis: &BasisGates) -> bool {
    inst.as_gate().is_none_or(|g| basis.contains(g.name()))
}

struct Translator<'a> {
    plan: TranslationPlan<'a>,
    basis: &'a BasisGates,
    euler_bases: Vec<EulerBasis>,
    atol: f64,
}

impl Translator<'_> {
    fn untranslatable(&self, gate: &str) -> CompileError {
        CompileError::BasisTranslation {
            gate: gate.to_string(),
            basis: self.basis.to_string(),
        }
    }

    /// Rewrite `inst` into basis gates, appending them to `out`.
    fn translate(
        &self,
        inst: &Instruction,
        condition: Option<&ClassicalCondition>,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        if is_native(inst, self.basis) {
            let mut inst = inst.clone();
            if let (Some(condition), Some(gate)) = (condition, inst.gate_mut()) {
                gate.condition = Some(condition.clone());
            }
            out.push(inst);
            return Ok(());
        }

        let Some(gate) = inst.as_gate() else {
            return Ok(());
        };
        let GateKind::Standard(standard) = &gate.kind else {
            return self.resynthesize(inst, gate, condition, out);
        };
        let params: Vec<ParameterExpression> =
            standard.parameters().into_iter().cloned().collect();
        let body = self
            .plan
            .rule_for(standard.name())
            .and_then(|rule| rule.expand(&params))
            .ok_or_else(|| self.untranslatable(standard.name()))?;

        let condition = condition.or(gate.condition.as_ref());
        let to_global = local_to_global(&inst.qubits);
        for member in &body {
            self.translate(&member.remapped(&to_global), condition, out)?;
        }
        Ok(())
    }

    /// Euler synthesis of a single-qubit matrix gate.
    fn resynthesize(
        &self,
        inst: &Instruction,
        gate: &Gate,
        condition: Option<&ClassicalCondition>,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        let (&[qubit], Some(m)) = (inst.qubits.as_slice(), gate_matrix(gate)) else {
            return Err(self.untranslatable(gate.name()));
        };
        let target = Unitary2x2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]);
        let (_, gates) = synthesize_best(&target, &self.euler_bases, self.atol)
            .ok_or_else(|| self.untranslatable(gate.name()))?;

        let condition = condition.or(gate.condition.as_ref());
        for standard in gates {
            self.translate(&Instruction::single_qubit_gate(standard, qubit), condition, out)?;
        }
        Ok(())
    }
}

/// Phase `phi` with `gate == e^{i phi} body`, when both have matrices.
fn rewrite_phase(inst: &Instruction, body: &[Instruction], tolerance: f64) -> CompileResult<f64> {
    let Some(target) = inst.as_gate().and_then(gate_matrix) else {
        return Ok(0.0);
    };
    let composed = match instructions_unitary(body, &inst.qubits) {
        Ok(u) => u,
        Err(CompileError::NonUnitary(_)) => return Ok(0.0),
        Err(e) => return Err(e),
    };
    let deviation = deviation_up_to_phase(&target, &composed);
    if deviation > tolerance {
        return Err(CompileError::NumericalToleranceExceeded {
            stage: STAGE.into(),
            deviation,
            tolerance,
        });
    }
    Ok(phase_between(&target, &composed))
}

/// Rewrite every gate outside the augmented basis through the standard
/// equivalence library.
///
/// Single-qubit matrix gates are re-synthesized over an Euler basis the
/// target supports. Wider matrix gates cannot be translated.
///
/// Directives are kept as is. A circuit that is already native is returned
/// unchanged. The global phase absorbs the phase of each unconditioned
/// rewrite.
pub fn basis_translation(dag: CircuitDag, config: &PipelineConfig) -> CompileResult<CircuitDag> {
    let basis = config.augmented_basis();
    if dag.ops().all(|(_, inst)| is_native(inst, &basis)) {
        debug!("Circuit already in basis [{}]", basis);
        return Ok(dag);
    }

    let translator = Translator {
        plan: EquivalenceLibrary::standard().plan(&basis),
        basis: &basis,
        euler_bases: EulerBasis::supported_by(&basis),
        atol: config.atol(),
    };
    let mut replacements: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();
    let mut phase = dag.global_phase();

    for (node, inst) in dag.ops() {
        if is_native(inst, &basis) {
            continue;
        }
        let mut body = Vec::new();
        translator.translate(inst, None, &mut body)?;
        if !inst.is_conditioned() {
            phase += rewrite_phase(inst, &body, config.tolerance())?;
        }
        replacements.insert(node, body);
    }

    debug!("Translated {} gates into [{}]", replacements.len(), basis);
    rebuild(&dag, replacements, &FxHashSet::default(), phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::circuit_unitary;
    use crisp_ir::{Circuit, CustomGate, Gate, QubitId, StandardGate};
    use crisp_pulse::InstructionMap;
    use std::sync::Arc;

    fn config(basis: BasisGates) -> PipelineConfig {
        PipelineConfig::new(basis, Arc::new(InstructionMap::synthetic(3, &[])))
    }

    fn max_diff(dag_a: &CircuitDag, dag_b: &CircuitDag) -> f64 {
        let a = circuit_unitary(dag_a).unwrap();
        let b = circuit_unitary(dag_b).unwrap();
        (&a - &b).iter().map(|v| v.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn test_output_is_native_and_exact() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .ry(0.7, QubitId(1))
            .unwrap()
            .swap(QubitId(0), QubitId(2))
            .unwrap()
            .cswap(QubitId(1), QubitId(0), QubitId(2))
            .unwrap()
            .t(QubitId(2))
            .unwrap();
        let config = config(BasisGates::ibm_cr());
        let dag = basis_translation(circuit.dag().clone(), &config).unwrap();
        let basis = config.augmented_basis();
        assert!(dag.ops().all(|(_, i)| basis.contains(i.name())));
        // Global phase included.
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_native_circuit_unchanged() {
        let mut circuit = Circuit::with_size("t", 2, 1);
        circuit
            .rz(0.2, QubitId(0))
            .unwrap()
            .sx(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .rzx(0.1, QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(1), crisp_ir::ClbitId(0))
            .unwrap();
        let dag = basis_translation(circuit.dag().clone(), &config(BasisGates::ibm_cr())).unwrap();
        let before: Vec<_> = circuit.dag().ops().map(|(_, i)| i.clone()).collect();
        let after: Vec<_> = dag.ops().map(|(_, i)| i.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_translation_is_idempotent() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.h(QubitId(0)).unwrap().cz(QubitId(0), QubitId(1)).unwrap();
        let config = config(BasisGates::ibm_cr());
        let once = basis_translation(circuit.into_dag(), &config).unwrap();
        let twice = basis_translation(once.clone(), &config).unwrap();
        let a: Vec<_> = once.ops().map(|(_, i)| i.clone()).collect();
        let b: Vec<_> = twice.ops().map(|(_, i)| i.clone()).collect();
        assert_eq!(a, b);
        assert_eq!(once.global_phase(), twice.global_phase());
    }

    #[test]
    fn test_rxx_basis_without_cx() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let config = config(BasisGates::new(["rz", "sx", "x", "rxx"]));
        let dag = basis_translation(circuit.dag().clone(), &config).unwrap();
        assert!(dag.count_ops().contains_key("rxx"));
        assert!(!dag.count_ops().contains_key("cx"));
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_symbolic_parameters_are_substituted() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit
            .ry(ParameterExpression::symbol("a"), QubitId(0))
            .unwrap();
        let dag = basis_translation(circuit.into_dag(), &config(BasisGates::ibm_cr())).unwrap();
        assert!(dag.ops().all(|(_, i)| ["rz", "sx", "x"].contains(&i.name())));
        let symbolic = dag
            .ops()
            .filter_map(|(_, i)| i.as_standard())
            .flat_map(|g| g.parameters())
            .any(ParameterExpression::is_symbolic);
        assert!(symbolic);
    }

    #[test]
    fn test_condition_reaches_every_gate() {
        let mut circuit = Circuit::with_size("t", 1, 1);
        let gate = Gate::standard(StandardGate::H).with_condition(ClassicalCondition::new("c", 1));
        circuit.gate(gate, [QubitId(0)]).unwrap();
        let dag = basis_translation(circuit.into_dag(), &config(BasisGates::ibm_cr())).unwrap();
        assert!(dag.num_ops() > 1);
        assert!(dag.ops().all(|(_, i)| i.is_conditioned()));
    }

    #[test]
    fn test_opaque_custom_gate_is_rejected() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.gate(CustomGate::new("mystery", 1), [QubitId(0)]).unwrap();
        let err = basis_translation(circuit.into_dag(), &config(BasisGates::ibm_cr())).unwrap_err();
        assert!(matches!(err, CompileError::BasisTranslation { ref gate, .. } if gate == "mystery"));
    }

    fn identity(dim: usize) -> Vec<num_complex::Complex64> {
        let mut m = vec![num_complex::Complex64::new(0.0, 0.0); dim * dim];
        for i in 0..dim {
            m[i * (dim + 1)] = num_complex::Complex64::new(1.0, 0.0);
        }
        m
    }

    #[test]
    fn test_single_qubit_unitary_is_resynthesized() {
        let ry = crate::unitary::standard_gate_matrix(&StandardGate::Ry(0.7.into())).unwrap();
        let t = crate::unitary::standard_gate_matrix(&StandardGate::T).unwrap();
        let m = &t * &ry;
        let m = &m;
        let data: Vec<_> = (0..2).flat_map(|r| (0..2).map(move |c| m[(r, c)])).collect();
        let gate = CustomGate::new(crisp_ir::UNITARY_GATE_NAME, 1).with_matrix(data).unwrap();
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.gate(gate, [QubitId(2)]).unwrap();

        let config = config(BasisGates::ibm_cr());
        let dag = basis_translation(circuit.dag().clone(), &config).unwrap();
        assert!(dag.ops().all(|(_, i)| ["rz", "sx", "x"].contains(&i.name())));
        assert!(dag.ops().all(|(_, i)| i.qubits == vec![QubitId(2)]));
        assert!(max_diff(circuit.dag(), &dag) < 1e-9);
    }

    #[test]
    fn test_wide_unitary_is_rejected() {
        let gate = CustomGate::new(crisp_ir::UNITARY_GATE_NAME, 3)
            .with_matrix(identity(8))
            .unwrap();
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.gate(gate, [QubitId(0), QubitId(1), QubitId(2)]).unwrap();
        let err = basis_translation(circuit.into_dag(), &config(BasisGates::ibm_cr())).unwrap_err();
        assert!(matches!(err, CompileError::BasisTranslation { ref gate, .. } if gate == "unitary"));
    }

    #[test]
    fn test_missing_entangler_is_rejected() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let err = basis_translation(circuit.into_dag(), &config(BasisGates::new(["rz", "sx"])))
            .unwrap_err();
        assert!(matches!(err, CompileError::BasisTranslation { ref gate, .. } if gate == "cz"));
    }
}
