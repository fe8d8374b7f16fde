//! Block consolidation into opaque two-qubit unitaries.

use crisp_ir::{CircuitDag, CustomGate, Gate, Instruction, NodeIndex};
use nalgebra::Matrix4;
use num_complex::Complex64;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Block, rebuild};
use crate::config::PipelineConfig;
use crate::error::{CompileError, CompileResult};
use crate::simulate::instructions_unitary;
use crate::unitary::{row_major, to_matrix4, unitarity_deviation};

const STAGE: &str = "consolidate_blocks";

/// Compose a block's members into the 4x4 unitary on `block.qubits`.
pub(crate) fn block_unitary(dag: &CircuitDag, block: &Block) -> CompileResult<Matrix4<Complex64>> {
    let members = block
        .nodes
        .iter()
        .map(|&node| {
            dag.get_instruction(node).ok_or_else(|| CompileError::Consolidation {
                qubits: block.qubits,
                reason: format!("node {} is not an operation", node.index()),
            })
        })
        .collect::<CompileResult<Vec<&Instruction>>>()?;

    let matrix = instructions_unitary(members, &block.qubits).map_err(|e| match e {
        CompileError::NonUnitary(name) => CompileError::Consolidation {
            qubits: block.qubits,
            reason: format!("'{name}' has no matrix"),
        },
        other => other,
    })?;
    to_matrix4(&matrix).ok_or_else(|| CompileError::Consolidation {
        qubits: block.qubits,
        reason: "block is not two-qubit".into(),
    })
}

/// Replace each block by one `unitary` gate at the position of its last member.
///
/// The gate is labelled with the configured synthesis basis. Blocks whose
/// members lack a matrix are left untouched.
pub fn consolidate_blocks(
    dag: CircuitDag,
    blocks: &[Block],
    config: &PipelineConfig,
) -> CompileResult<CircuitDag> {
    let label = config.synthesis_basis().join(",");
    let mut replacements: FxHashMap<NodeIndex, Vec<Instruction>> = FxHashMap::default();
    let mut removed: FxHashSet<NodeIndex> = FxHashSet::default();

    for block in blocks {
        let Some(last) = block.last_node() else {
            continue;
        };
        let unitary = match block_unitary(&dag, block) {
            Ok(u) => u,
            Err(CompileError::Consolidation { qubits, reason }) => {
                debug!("Skipping block on ({}, {}): {}", qubits[0], qubits[1], reason);
                continue;
            }
            Err(e) => return Err(e),
        };

        let deviation = unitarity_deviation(&unitary);
        if deviation > config.tolerance() {
            return Err(CompileError::NumericalToleranceExceeded {
                stage: STAGE.into(),
                deviation,
                tolerance: config.tolerance(),
            });
        }

        let gate = Gate::custom(CustomGate::unitary(row_major(&unitary))?).with_label(label.clone());
        replacements.insert(last, vec![Instruction::gate(gate, block.qubits)]);
        removed.extend(block.nodes.iter().copied());
    }

    debug!("Consolidated {} of {} blocks", replacements.len(), blocks.len());
    let phase = dag.global_phase();
    rebuild(&dag, replacements, &removed, phase)
}
