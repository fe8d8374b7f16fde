//! Two-qubit block collection.

use crisp_ir::{CircuitDag, Instruction, NodeIndex, QubitId};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::Block;

enum Role {
    Single(QubitId),
    Pair(QubitId, QubitId),
    Boundary,
}

fn role(inst: &Instruction) -> Role {
    match inst.as_gate() {
        Some(gate) if gate.condition.is_none() => match inst.qubits.as_slice() {
            &[q] => Role::Single(q),
            &[a, b] => Role::Pair(a, b),
            _ => Role::Boundary,
        },
        _ => Role::Boundary,
    }
}

#[derive(Default)]
struct Collector {
    blocks: Vec<Block>,
    /// Open block owning each wire.
    owner: FxHashMap<QubitId, usize>,
    /// Single-qubit gates seen on an unowned wire since its last boundary.
    pending: FxHashMap<QubitId, Vec<NodeIndex>>,
}

impl Collector {
    fn close(&mut self, qubit: QubitId) {
        if let Some(index) = self.owner.remove(&qubit) {
            for q in self.blocks[index].qubits {
                if self.owner.get(&q) == Some(&index) {
                    self.owner.remove(&q);
                }
            }
        }
    }

    fn single(&mut self, node: NodeIndex, qubit: QubitId) {
        match self.owner.get(&qubit) {
            Some(&index) => self.blocks[index].nodes.push(node),
            None => self.pending.entry(qubit).or_default().push(node),
        }
    }

    fn pair(&mut self, node: NodeIndex, a: QubitId, b: QubitId) {
        match (self.owner.get(&a), self.owner.get(&b)) {
            (Some(x), Some(y)) if x == y => {
                let index = *x;
                self.blocks[index].nodes.push(node);
            }
            _ => {
                self.close(a);
                self.close(b);
                let mut nodes = self.pending.remove(&a).unwrap_or_default();
                nodes.extend(self.pending.remove(&b).unwrap_or_default());
                nodes.sort_unstable();
                nodes.push(node);
                let index = self.blocks.len();
                self.blocks.push(Block {
                    qubits: [a, b],
                    nodes,
                });
                self.owner.insert(a, index);
                self.owner.insert(b, index);
            }
        }
    }

    fn boundary(&mut self, qubits: &[QubitId]) {
        for &q in qubits {
            self.close(q);
            self.pending.remove(&q);
        }
    }
}

/// Group maximal runs of gates acting only on one qubit pair.
///
/// Single-qubit gates join the open block of their wire, or wait to be
/// prepended to the next block opened on that wire. A two-qubit gate on a
/// pair whose wires are not owned by one block closes both wires' blocks and
/// opens a new one. Any other operation closes the blocks on its qubits and
/// is never absorbed. Every returned block holds at least one two-qubit gate.
pub fn collect_2q_blocks(dag: &CircuitDag) -> Vec<Block> {
    let mut collector = Collector::default();
    for (node, inst) in dag.ops() {
        match role(inst) {
            Role::Single(q) => collector.single(node, q),
            Role::Pair(a, b) => collector.pair(node, a, b),
            Role::Boundary => collector.boundary(&inst.qubits),
        }
    }
    debug!("Collected {} two-qubit blocks", collector.blocks.len());
    collector.blocks
}
