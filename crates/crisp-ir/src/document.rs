//! JSON exchange format for circuits and their calibrations.
//!
//! ```json
//! {
//!   "name": "bell",
//!   "num_qubits": 2,
//!   "num_clbits": 2,
//!   "instructions": [
//!     { "name": "h", "qubits": [0] },
//!     { "name": "rz", "qubits": [1], "params": [0.5] },
//!     { "name": "cx", "qubits": [0, 1] },
//!     { "name": "measure", "qubits": [0], "clbits": [0] }
//!   ]
//! }
//! ```
//!
//! Gates outside the standard set carry a `matrix`, a `definition` over
//! local qubits, or both:
//!
//! ```json
//! {
//!   "name": "bell_pair",
//!   "qubits": [2, 0],
//!   "definition": [
//!     { "name": "h", "qubits": [0] },
//!     { "name": "cx", "qubits": [0, 1] }
//!   ]
//! }
//! ```

use crisp_pulse::Schedule;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationKey;
use crate::circuit::Circuit;
use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{ClassicalCondition, CustomGate, Gate, GateKind, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A gate parameter as written in a document: a number or a free symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric angle.
    Number(f64),
    /// Unbound symbol.
    Symbol(String),
}

impl From<ParamValue> for ParameterExpression {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Number(v) => ParameterExpression::Constant(v),
            ParamValue::Symbol(s) => ParameterExpression::Symbol(s),
        }
    }
}

impl TryFrom<&ParameterExpression> for ParamValue {
    type Error = IrError;

    fn try_from(expr: &ParameterExpression) -> IrResult<Self> {
        if let Some(v) = expr.as_f64() {
            return Ok(ParamValue::Number(v));
        }
        match expr {
            ParameterExpression::Symbol(s) => Ok(ParamValue::Symbol(s.clone())),
            other => Err(IrError::UnboundParameter(other.to_string())),
        }
    }
}

/// One instruction of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Gate or directive name.
    pub name: String,
    /// Qubit operands.
    pub qubits: Vec<u32>,
    /// Classical operands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
    /// Gate parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamValue>,
    /// Row-major matrix as `[re, im]` pairs, for opaque unitary gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<[f64; 2]>>,
    /// Body over local qubits `0..qubits.len()`, for custom gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Vec<OperationRecord>>,
    /// Delay duration in samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Gate label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

/// A calibration attached to a gate instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Gate name.
    pub gate: String,
    /// Qubit operands.
    pub qubits: Vec<u32>,
    /// Parameter values.
    #[serde(default)]
    pub params: Vec<f64>,
    /// Pulse schedule.
    pub schedule: Schedule,
}

/// A serialized circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDocument {
    /// Circuit name.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: u32,
    /// Number of classical bits.
    #[serde(default)]
    pub num_clbits: u32,
    /// Global phase in radians.
    #[serde(default)]
    pub global_phase: f64,
    /// Instructions in program order.
    pub instructions: Vec<OperationRecord>,
    /// Attached pulse calibrations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calibrations: Vec<CalibrationRecord>,
}

impl CircuitDocument {
    /// Parse a document from JSON.
    pub fn from_json(source: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Describe a DAG as a document.
    pub fn from_dag(name: impl Into<String>, dag: &CircuitDag) -> IrResult<Self> {
        let instructions = dag
            .ops()
            .map(|(_, inst)| record_from_instruction(inst))
            .collect::<IrResult<Vec<_>>>()?;
        let calibrations = dag
            .calibrations()
            .iter()
            .map(|(key, schedule)| CalibrationRecord {
                gate: key.gate.clone(),
                qubits: key.qubits.iter().map(|q| q.0).collect(),
                params: key.param_values(),
                schedule: schedule.clone(),
            })
            .collect();
        Ok(Self {
            name: name.into(),
            num_qubits: dag.qubits().last().map_or(0, |q| q.0 + 1),
            num_clbits: dag.clbits().last().map_or(0, |c| c.0 + 1),
            global_phase: dag.global_phase(),
            instructions,
            calibrations,
        })
    }

    /// Build the circuit the document describes.
    pub fn to_circuit(&self) -> IrResult<Circuit> {
        let mut dag =
            Circuit::with_size(self.name.clone(), self.num_qubits, self.num_clbits).into_dag();
        for record in &self.instructions {
            dag.apply(instruction_from_record(record)?)?;
        }
        dag.set_global_phase(self.global_phase);
        for cal in &self.calibrations {
            let key = CalibrationKey::new(
                cal.gate.clone(),
                cal.qubits.iter().map(|&q| QubitId(q)).collect(),
                &cal.params,
            );
            dag.add_calibration(key, cal.schedule.clone());
        }
        Ok(Circuit::from_dag(self.name.clone(), dag))
    }
}

fn record_from_instruction(inst: &Instruction) -> IrResult<OperationRecord> {
    let mut record = OperationRecord {
        name: inst.name().to_string(),
        qubits: inst.qubits.iter().map(|q| q.0).collect(),
        clbits: inst.clbits.iter().map(|c| c.0).collect(),
        params: vec![],
        matrix: None,
        definition: None,
        duration: None,
        label: None,
        condition: None,
    };
    match &inst.kind {
        InstructionKind::Gate(gate) => {
            record.params = gate
                .kind
                .parameters()
                .into_iter()
                .map(ParamValue::try_from)
                .collect::<IrResult<_>>()?;
            if let GateKind::Custom(custom) = &gate.kind {
                record.matrix = custom
                    .matrix
                    .as_ref()
                    .map(|m| m.iter().map(|c| [c.re, c.im]).collect());
                record.definition = custom
                    .definition
                    .as_ref()
                    .map(|body| {
                        body.iter()
                            .map(record_from_instruction)
                            .collect::<IrResult<Vec<_>>>()
                    })
                    .transpose()?;
            }
            record.label.clone_from(&gate.label);
            record.condition.clone_from(&gate.condition);
        }
        InstructionKind::Delay { duration } => record.duration = Some(*duration),
        InstructionKind::Measure | InstructionKind::Reset | InstructionKind::Barrier => {}
    }
    Ok(record)
}

#[allow(clippy::cast_possible_truncation)]
fn instruction_from_record(record: &OperationRecord) -> IrResult<Instruction> {
    let qubits: Vec<QubitId> = record.qubits.iter().map(|&q| QubitId(q)).collect();
    let clbits: Vec<ClbitId> = record.clbits.iter().map(|&c| ClbitId(c)).collect();
    let kind = match record.name.as_str() {
        "measure" => InstructionKind::Measure,
        "reset" => InstructionKind::Reset,
        "barrier" => InstructionKind::Barrier,
        "delay" => InstructionKind::Delay {
            duration: record.duration.unwrap_or(0),
        },
        name => {
            let params: Vec<ParameterExpression> =
                record.params.iter().cloned().map(Into::into).collect();
            let kind = if record.matrix.is_some() || record.definition.is_some() {
                let mut custom = CustomGate::new(name, qubits.len() as u32).with_params(params);
                if let Some(matrix) = &record.matrix {
                    let matrix = matrix.iter().map(|&[re, im]| Complex64::new(re, im)).collect();
                    custom = custom.with_matrix(matrix)?;
                }
                if let Some(body) = &record.definition {
                    let body = body
                        .iter()
                        .map(instruction_from_record)
                        .collect::<IrResult<Vec<_>>>()?;
                    custom = custom.with_definition(body)?;
                }
                GateKind::Custom(custom)
            } else {
                let num_params = params.len();
                GateKind::Standard(StandardGate::from_name(name, params).ok_or_else(|| {
                    IrError::UnknownGate {
                        name: name.to_string(),
                        num_params,
                    }
                })?)
            };
            InstructionKind::Gate(Gate {
                kind,
                label: record.label.clone(),
                condition: record.condition.clone(),
            })
        }
    };
    Ok(Instruction {
        kind,
        qubits,
        clbits,
    })
}
