//! DAG-based circuit representation.

use crisp_pulse::Schedule;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::CalibrationKey;
use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// DAG-based circuit representation.
///
/// Nodes are wire inputs, wire outputs and operations; every edge carries the
/// wire it belongs to. The graph only grows: operations are appended at the
/// end of their wires and never removed. Passes that rewrite a circuit build
/// a fresh DAG with [`CircuitDag::empty_like`] and re-append operations in
/// order. As a consequence node index order is a topological order, and
/// [`CircuitDag::ops`] yields operations in program order without sorting.
///
/// The DAG also carries the pulse calibrations attached to gate instances.
#[derive(Debug, Clone, Default)]
pub struct CircuitDag {
    /// The underlying graph.
    graph: DiGraph<DagNode, DagEdge, u32>,
    /// Input and output node per wire.
    wires: FxHashMap<WireId, (NodeIndex, NodeIndex)>,
    /// Wire front: maps each wire to the node just before the output node.
    wire_front: FxHashMap<WireId, NodeIndex>,
    /// Global phase of the circuit.
    global_phase: f64,
    /// Pulse schedules keyed by gate instance.
    calibrations: BTreeMap<CalibrationKey, Schedule>,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// A DAG with the same wires, global phase and calibrations, but no
    /// operations.
    pub fn empty_like(&self) -> Self {
        let mut dag = Self::new();
        for qubit in self.qubits() {
            dag.add_qubit(qubit);
        }
        for clbit in self.clbits() {
            dag.add_clbit(clbit);
        }
        dag.global_phase = self.global_phase;
        dag.calibrations = self.calibrations.clone();
        dag
    }

    fn add_wire(&mut self, wire: WireId) {
        if self.wires.contains_key(&wire) {
            return;
        }
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.wires.insert(wire, (in_node, out_node));
        self.wire_front.insert(wire, in_node);
    }

    /// Add a qubit to the circuit.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        self.add_wire(WireId::Qubit(qubit));
    }

    /// Add a classical bit to the circuit.
    pub fn add_clbit(&mut self, clbit: ClbitId) {
        self.add_wire(WireId::Clbit(clbit));
    }

    /// Append an instruction at the end of its wires.
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits() as usize;
            let got = instruction.qubits.len();
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: expected as u32,
                    got: got as u32,
                });
            }
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !self.wires.contains_key(&WireId::Qubit(qubit)) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if !self.wires.contains_key(&WireId::Clbit(clbit)) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let wires: Vec<WireId> = instruction
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(instruction.clbits.iter().map(|&c| WireId::Clbit(c)))
            .collect();
        let op_node = self.graph.add_node(DagNode::Op(instruction));

        for wire in wires {
            let (_, out_node) = self.wires[&wire];
            let prev_node = self.wire_front[&wire];

            let eid = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| e.weight().wire == wire && e.target() == out_node)
                .map(|e| e.id())
                .ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "Missing edge from predecessor to output for wire {wire:?}"
                    ))
                })?;
            self.graph.remove_edge(eid);
            self.graph.add_edge(prev_node, op_node, DagEdge { wire });
            self.graph.add_edge(op_node, out_node, DagEdge { wire });
            self.wire_front.insert(wire, op_node);
        }

        Ok(op_node)
    }

    /// Operations in program order.
    pub fn ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> + '_ {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph[idx].instruction().map(|inst| (idx, inst)))
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(|n| n.instruction())
    }

    /// Operations that directly precede `node` on any of its wires.
    pub fn op_predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut preds: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| e.source())
            .filter(|&n| self.graph[n].is_op())
            .collect();
        preds.sort();
        preds.dedup();
        preds
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.wires
            .keys()
            .filter(|w| matches!(w, WireId::Qubit(_)))
            .count()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.wires.len() - self.num_qubits()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.graph.node_count().saturating_sub(2 * self.wires.len())
    }

    /// Number of operations per instruction name.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, inst) in self.ops() {
            *counts.entry(inst.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Calculate the circuit depth.
    pub fn depth(&self) -> usize {
        let mut depths: FxHashMap<NodeIndex, usize> =
            FxHashMap::with_capacity_and_hasher(self.graph.node_count(), Default::default());
        let mut max_depth = 0usize;

        for (node, _) in self.ops() {
            let node_depth = self
                .op_predecessors(node)
                .iter()
                .map(|p| depths.get(p).copied().unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 1;
            max_depth = max_depth.max(node_depth);
            depths.insert(node, node_depth);
        }

        max_depth
    }

    /// Qubits, sorted.
    pub fn qubits(&self) -> Vec<QubitId> {
        let mut qubits: Vec<_> = self
            .wires
            .keys()
            .filter_map(|w| match w {
                WireId::Qubit(q) => Some(*q),
                WireId::Clbit(_) => None,
            })
            .collect();
        qubits.sort();
        qubits
    }

    /// Classical bits, sorted.
    pub fn clbits(&self) -> Vec<ClbitId> {
        let mut clbits: Vec<_> = self
            .wires
            .keys()
            .filter_map(|w| match w {
                WireId::Clbit(c) => Some(*c),
                WireId::Qubit(_) => None,
            })
            .collect();
        clbits.sort();
        clbits
    }

    /// Get the global phase.
    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    /// Set the global phase.
    pub fn set_global_phase(&mut self, phase: f64) {
        self.global_phase = phase;
    }

    /// Attach a pulse schedule to a gate instance.
    pub fn add_calibration(&mut self, key: CalibrationKey, schedule: Schedule) {
        self.calibrations.insert(key, schedule);
    }

    /// Schedule attached to the instance `inst`, if any.
    pub fn calibration_for(&self, inst: &Instruction) -> Option<&Schedule> {
        let key = CalibrationKey::for_instruction(inst)?;
        self.calibrations.get(&key)
    }

    /// All attached calibrations, ordered by key.
    pub fn calibrations(&self) -> &BTreeMap<CalibrationKey, Schedule> {
        &self.calibrations
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &DiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that the graph is acyclic and that every wire forms a single
    /// path from its input to its output node.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }

        let max_steps = self.graph.node_count();
        for (&wire, &(in_node, out_node)) in &self.wires {
            let mut current = in_node;
            let mut steps = 0;
            while current != out_node {
                current = self
                    .graph
                    .edges_directed(current, Direction::Outgoing)
                    .find(|e| e.weight().wire == wire)
                    .map(|e| e.target())
                    .ok_or_else(|| {
                        IrError::InvalidDag(format!(
                            "Wire {wire:?} is broken: no outgoing edge from node {current:?}"
                        ))
                    })?;
                steps += 1;
                if steps > max_steps {
                    return Err(IrError::InvalidDag(format!(
                        "Wire {wire:?} does not reach its output node"
                    )));
                }
            }
        }

        Ok(())
    }
}
