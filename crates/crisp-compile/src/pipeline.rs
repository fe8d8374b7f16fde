//! The pulse-efficient pipeline: an ordered fold over stage functions.

use std::fmt;

use tracing::{debug, info, instrument};

use crisp_ir::{CircuitDag, UNITARY_GATE_NAME};

use crate::config::{PipelineConfig, RZX_GATE_NAME};
use crate::error::{CompileError, CompileResult};
use crate::passes::{
    basis_translation, collect_2q_blocks, consolidate_blocks, echo_rzx_weyl_decomposition,
    optimize_1q_decomposition, rzx_calibrations, unroll_custom_definitions, verify_output,
};

/// A pipeline stage: consumes a graph and returns its replacement.
pub type StageFn = fn(CircuitDag, &PipelineConfig) -> CompileResult<CircuitDag>;

const CONSOLIDATE: &str = "consolidate_blocks";
const WEYL: &str = "echo_rzx_weyl_decomposition";

fn collect_and_consolidate(dag: CircuitDag, config: &PipelineConfig) -> CompileResult<CircuitDag> {
    let blocks = collect_2q_blocks(&dag);
    consolidate_blocks(dag, &blocks, config)
}

/// Op counts around one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Stage name.
    pub name: &'static str,
    /// Operations before the stage.
    pub ops_before: usize,
    /// Operations after the stage.
    pub ops_after: usize,
}

/// Statistics of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Per-stage op counts, in run order.
    pub stages: Vec<StageReport>,
    /// Blocks replaced by a `unitary` gate.
    pub consolidated_blocks: usize,
    /// `unitary` gates turned into CR sequences.
    pub decomposed_unitaries: usize,
    /// `rzx` gates in the output.
    pub cr_gates: usize,
    /// Calibrations attached to the output.
    pub calibrations: usize,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            writeln!(f, "  {:<30} {:>6} -> {:<6}", stage.name, stage.ops_before, stage.ops_after)?;
        }
        writeln!(f, "  consolidated blocks:  {}", self.consolidated_blocks)?;
        writeln!(f, "  decomposed unitaries: {}", self.decomposed_unitaries)?;
        writeln!(f, "  CR gates:             {}", self.cr_gates)?;
        write!(f, "  calibrations:         {}", self.calibrations)
    }
}

/// Runs the stages in order on one circuit at a time.
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<(&'static str, StageFn)>,
}

impl Pipeline {
    /// Block consolidation, echoed RZX Weyl decomposition, RZX calibration,
    /// unrolling, basis translation and 1q re-synthesis.
    pub fn pulse_efficient(config: PipelineConfig) -> Self {
        Self {
            config,
            stages: vec![
                (CONSOLIDATE, collect_and_consolidate as StageFn),
                (WEYL, echo_rzx_weyl_decomposition),
                ("rzx_calibrations", rzx_calibrations),
                ("unroll_custom_definitions", unroll_custom_definitions),
                ("basis_translation", basis_translation),
                ("optimize_1q_decomposition", optimize_1q_decomposition),
            ],
        }
    }

    /// The configuration every stage sees.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage names, in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    /// Two-qubit gates must act on connected pairs when a coupling map is set.
    fn check_connectivity(&self, dag: &CircuitDag) -> CompileResult<()> {
        let Some(coupling) = self.config.coupling_map() else {
            return Ok(());
        };
        for (_, inst) in dag.ops() {
            if !inst.is_gate() {
                continue;
            }
            if let &[a, b] = inst.qubits.as_slice() {
                if !coupling.is_connected(a.0, b.0) {
                    return Err(CompileError::DisconnectedQubits { q0: a.0, q1: b.0 });
                }
            }
        }
        Ok(())
    }

    /// Compile `dag`, returning the output graph and run statistics.
    ///
    /// The first failing stage aborts the run.
    #[instrument(skip(self, dag))]
    pub fn run(&self, dag: CircuitDag) -> CompileResult<(CircuitDag, PipelineReport)> {
        self.config.validate()?;
        self.check_connectivity(&dag)?;

        info!(
            "Running pipeline with {} stages on circuit with {} qubits, depth {}, ops {}",
            self.stages.len(),
            dag.num_qubits(),
            dag.depth(),
            dag.num_ops()
        );

        let unitaries = |dag: &CircuitDag| {
            dag.count_ops()
                .get(UNITARY_GATE_NAME)
                .copied()
                .unwrap_or(0)
        };
        let mut report = PipelineReport::default();
        let mut dag = dag;
        for &(name, stage) in &self.stages {
            let ops_before = dag.num_ops();
            let unitaries_before = unitaries(&dag);
            debug!("Running stage: {}", name);
            dag = stage(dag, &self.config)?;
            let unitaries_after = unitaries(&dag);
            match name {
                CONSOLIDATE => {
                    report.consolidated_blocks = unitaries_after.saturating_sub(unitaries_before);
                }
                WEYL => {
                    report.decomposed_unitaries = unitaries_before.saturating_sub(unitaries_after);
                }
                _ => {}
            }
            debug!("Stage {} completed, ops: {}", name, dag.num_ops());
            report.stages.push(StageReport {
                name,
                ops_before,
                ops_after: dag.num_ops(),
            });
        }

        if self.config.verify() {
            verify_output(&dag, &self.config)?;
        }

        report.cr_gates = dag.count_ops().get(RZX_GATE_NAME).copied().unwrap_or(0);
        report.calibrations = dag.calibrations().len();
        info!(
            "Pipeline completed, final depth: {}, ops: {}, CR gates: {}",
            dag.depth(),
            dag.num_ops(),
            report.cr_gates
        );
        Ok((dag, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BasisGates, CouplingMap};
    use crisp_ir::{Circuit, QubitId};
    use crisp_pulse::InstructionMap;
    use std::sync::Arc;

    fn pipeline(pairs: &[(u32, u32)]) -> Pipeline {
        let map = InstructionMap::synthetic(3, pairs);
        Pipeline::pulse_efficient(PipelineConfig::new(BasisGates::ibm_cr(), Arc::new(map)))
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(
            pipeline(&[]).stage_names(),
            vec![
                "consolidate_blocks",
                "echo_rzx_weyl_decomposition",
                "rzx_calibrations",
                "unroll_custom_definitions",
                "basis_translation",
                "optimize_1q_decomposition",
            ]
        );
    }

    #[test]
    fn test_report_counts() {
        let circuit = Circuit::ghz(3).unwrap();
        let (dag, report) = pipeline(&[(0, 1), (1, 2)]).run(circuit.into_dag()).unwrap();
        assert_eq!(report.stages.len(), 6);
        assert_eq!(report.consolidated_blocks, 2);
        assert_eq!(report.decomposed_unitaries, 2);
        assert_eq!(report.cr_gates, 4);
        assert_eq!(report.cr_gates, dag.count_ops()["rzx"]);
        assert!(report.calibrations >= 1);
        assert!(report.to_string().contains("CR gates"));
    }

    #[test]
    fn test_disconnected_pair_rejected() {
        let map = InstructionMap::synthetic(3, &[(0, 1), (1, 2)]);
        let config = PipelineConfig::new(BasisGates::ibm_cr(), Arc::new(map))
            .with_coupling_map(CouplingMap::linear(3));
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let err = Pipeline::pulse_efficient(config).run(circuit.into_dag()).unwrap_err();
        assert!(matches!(err, CompileError::DisconnectedQubits { q0: 0, q1: 2 }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::new(
            BasisGates::ibm_cr(),
            Arc::new(InstructionMap::synthetic(1, &[])),
        )
        .with_tolerance(-1.0);
        let err = Pipeline::pulse_efficient(config)
            .run(Circuit::with_size("t", 1, 0).into_dag())
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConfig(_)));
    }
}
