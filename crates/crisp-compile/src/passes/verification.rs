//! Output contract checks.

use crisp_ir::CircuitDag;
use tracing::debug;

use crate::config::{PipelineConfig, RZX_GATE_NAME};
use crate::error::{CompileError, CompileResult};

/// Check that a compiled graph is executable on the backend.
///
/// The graph must be well formed, every gate must belong to the augmented
/// basis and every `rzx` instance must carry a calibration.
pub fn verify_output(dag: &CircuitDag, config: &PipelineConfig) -> CompileResult<()> {
    dag.verify_integrity()?;

    let basis = config.augmented_basis();
    let mut calibrated = 0usize;
    for (_, inst) in dag.ops() {
        let Some(gate) = inst.as_gate() else {
            continue;
        };
        if !basis.contains(gate.name()) {
            return Err(CompileError::BasisTranslation {
                gate: gate.name().to_string(),
                basis: basis.to_string(),
            });
        }
        if gate.name() == RZX_GATE_NAME {
            if dag.calibration_for(inst).is_none() {
                return Err(CompileError::CalibrationUnavailable {
                    gate: RZX_GATE_NAME.into(),
                    qubits: inst.qubits.iter().map(|q| q.0).collect(),
                });
            }
            calibrated += 1;
        }
    }

    debug!("Output verified: {} ops, {} calibrated CR gates", dag.num_ops(), calibrated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasisGates;
    use crisp_ir::{CalibrationKey, Circuit, QubitId};
    use crisp_pulse::{InstructionMap, Schedule};
    use std::sync::Arc;

    fn config() -> PipelineConfig {
        PipelineConfig::new(BasisGates::ibm_cr(), Arc::new(InstructionMap::synthetic(2, &[(0, 1)])))
    }

    #[test]
    fn test_native_calibrated_circuit_passes() {
        let mut circuit = Circuit::with_size("t", 2, 1);
        circuit
            .rz(0.1, QubitId(0))
            .unwrap()
            .rzx(0.4, QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(0), crisp_ir::ClbitId(0))
            .unwrap();
        let mut dag = circuit.into_dag();
        dag.add_calibration(
            CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.4]),
            Schedule::new("rzx"),
        );
        assert!(verify_output(&dag, &config()).is_ok());
    }

    #[test]
    fn test_foreign_gate_fails() {
        let mut circuit = Circuit::with_size("t", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let err = verify_output(circuit.dag(), &config()).unwrap_err();
        assert!(matches!(err, CompileError::BasisTranslation { ref gate, .. } if gate == "h"));
    }

    #[test]
    fn test_uncalibrated_rzx_fails() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        circuit.rzx(0.4, QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        // A calibration for another angle does not count.
        dag.add_calibration(
            CalibrationKey::new("rzx", vec![QubitId(0), QubitId(1)], &[0.5]),
            Schedule::new("rzx"),
        );
        let err = verify_output(&dag, &config()).unwrap_err();
        assert!(matches!(err, CompileError::CalibrationUnavailable { .. }));
    }
}
