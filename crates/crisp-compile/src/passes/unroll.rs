//! Custom gate unrolling.

use crisp_ir::{CircuitDag, ClassicalCondition, GateKind, Instruction, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{local_to_global, rebuild};
use crate::config::{BasisGates, PipelineConfig};
use crate::error::CompileResult;

/// Expand `inst` into `out`, recursing into nested definitions.
fn expand(
    inst: &Instruction,
    basis: &BasisGates,
    condition: Option<&ClassicalCondition>,
    out: &mut Vec<Instruction>,
) {
    let body = match inst.as_gate().map(|g| &g.kind) {
        Some(GateKind::Custom(custom)) if !basis.contains(&custom.name) => custom.definition.as_ref(),
        _ => None,
    };
    let Some(body) = body else {
        let mut inst = inst.clone();
        if let (Some(condition), Some(gate)) = (condition, inst.gate_mut()) {
            if gate.condition.is_none() {
                gate.condition = Some(condition.clone());
            }
        }
        out.push(inst);
        return;
    };

    let condition = condition.or_else(|| inst.as_gate().and_then(|g| g.condition.as_ref()));
    let to_global = local_to_global(&inst.qubits);
    for member in body {
        expand(&member.remapped(&to_global), basis, condition, out);
    }
}

/// Replace custom gates outside the basis by their definitions, recursively.
///
/// A condition on an unrolled gate is copied onto every gate of its body.
/// Custom gates without a definition are kept for the translator to reject.
pub fn unroll_custom_definitions(
    dag: CircuitDag,
    config: &PipelineConfig,
) -> CompileResult<CircuitDag> {
    let basis = config.augmented_basis();
    let mut replacements: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();

    for (node, inst) in dag.ops() {
        let unrollable = match inst.as_gate().map(|g| &g.kind) {
            Some(GateKind::Custom(custom)) => {
                custom.definition.is_some() && !basis.contains(&custom.name)
            }
            _ => false,
        };
        if unrollable {
            let mut body = Vec::new();
            expand(inst, &basis, None, &mut body);
            replacements.insert(node, body);
        }
    }

    if replacements.is_empty() {
        return Ok(dag);
    }
    debug!("Unrolled {} custom gates", replacements.len());
    let phase = dag.global_phase();
    rebuild(&dag, replacements, &FxHashSet::default(), phase)
}
