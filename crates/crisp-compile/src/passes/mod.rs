//! The pipeline stages.
//!
//! Each stage is a plain function taking the graph by value and returning the
//! rewritten graph, in the order [`crate::Pipeline`] runs them:
//!
//! 1. [`collect_2q_blocks`] and [`consolidate_blocks`]
//! 2. [`echo_rzx_weyl_decomposition`]
//! 3. [`rzx_calibrations`]
//! 4. [`unroll_custom_definitions`] and [`basis_translation`]
//! 5. [`optimize_1q_decomposition`]
//!
//! [`verify_output`] checks the result.

mod basis_translation;
mod collect_2q_blocks;
mod consolidate_blocks;
mod echo_rzx_weyl;
mod optimize_1q;
mod rzx_calibration;
mod unroll;
mod verification;

use crisp_ir::{CircuitDag, Instruction, NodeIndex, QubitId};

use crate::error::CompileResult;

pub use basis_translation::basis_translation;
pub use collect_2q_blocks::collect_2q_blocks;
pub use consolidate_blocks::consolidate_blocks;
pub use echo_rzx_weyl::echo_rzx_weyl_decomposition;
pub use optimize_1q::optimize_1q_decomposition;
pub use rzx_calibration::rzx_calibrations;
pub use unroll::unroll_custom_definitions;
pub use verification::verify_output;

/// Operations on one qubit pair, in program order.
///
/// Only valid for the graph it was collected from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The pair, in the operand order of the block's first two-qubit gate.
    pub qubits: [QubitId; 2],
    /// Member operations, sorted by node index.
    pub nodes: Vec<NodeIndex>,
}

impl Block {
    /// Number of member operations.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the block has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Member emitted last.
    pub fn last_node(&self) -> Option<NodeIndex> {
        self.nodes.last().copied()
    }

    /// Whether `node` is a member.
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.binary_search(&node).is_ok()
    }
}

/// Map local qubit `k` of a gate body to the `k`-th operand.
fn local_to_global(operands: &[QubitId]) -> impl Fn(QubitId) -> QubitId + '_ {
    move |q| operands.get(q.0 as usize).copied().unwrap_or(q)
}

/// Rebuild `dag` in program order, emitting `replacements` at their keyed
/// node and dropping every node in `removed`.
fn rebuild(
    dag: &CircuitDag,
    mut replacements: rustc_hash::FxHashMap<NodeIndex, Vec<Instruction>>,
    removed: &rustc_hash::FxHashSet<NodeIndex>,
    global_phase: f64,
) -> CompileResult<CircuitDag> {
    let mut out = dag.empty_like();
    out.set_global_phase(global_phase);
    for (node, inst) in dag.ops() {
        if let Some(body) = replacements.remove(&node) {
            for replacement in body {
                out.apply(replacement)?;
            }
        } else if !removed.contains(&node) {
            out.apply(inst.clone())?;
        }
    }
    Ok(out)
}
