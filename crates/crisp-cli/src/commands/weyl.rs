//! Weyl command implementation.

use anyhow::{Context, Result};
use console::style;
use serde_json::json;

use crisp_compile::config::DEFAULT_ATOL;
use crisp_compile::unitary::{standard_gate_matrix, to_matrix4};
use crisp_compile::{EchoMode, weyl};
use crisp_ir::{Instruction, ParameterExpression, StandardGate};

/// Build a named two-qubit standard gate.
pub fn two_qubit_gate(name: &str, params: &[f64]) -> Result<StandardGate> {
    let exprs: Vec<ParameterExpression> = params.iter().map(|&p| p.into()).collect();
    let gate = StandardGate::from_name(&name.to_lowercase(), exprs).ok_or_else(|| {
        anyhow::anyhow!("Unknown gate '{name}' with {} parameter(s)", params.len())
    })?;
    if gate.num_qubits() != 2 {
        anyhow::bail!("'{name}' acts on {} qubit(s), expected 2", gate.num_qubits());
    }
    Ok(gate)
}

fn describe(inst: &Instruction) -> String {
    let qubits: Vec<String> = inst.qubits.iter().map(ToString::to_string).collect();
    let params = inst
        .as_gate()
        .and_then(|g| g.param_values())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let p: Vec<String> = p.iter().map(|v| format!("{v:.6}")).collect();
            format!("({})", p.join(", "))
        })
        .unwrap_or_default();
    format!("{}{} {}", inst.name(), params, qubits.join(", "))
}

/// Execute the weyl command.
pub fn execute(gate: &str, params: &[f64], echo_mode: EchoMode, as_json: bool) -> Result<()> {
    let standard = two_qubit_gate(gate, params)?;
    let matrix = standard_gate_matrix(&standard)
        .and_then(|m| to_matrix4(&m))
        .with_context(|| format!("No matrix available for '{gate}'"))?;
    let decomposition = weyl::decompose(&matrix)?;
    let coordinates = decomposition.coordinates.snapped(DEFAULT_ATOL);
    let recipe = decomposition.rzx_recipe(echo_mode);

    if as_json {
        let report = json!({
            "gate": standard.name(),
            "params": params,
            "coordinates": [coordinates.a, coordinates.b, coordinates.c],
            "interactions": coordinates.num_interactions(DEFAULT_ATOL),
            "echo_mode": format!("{echo_mode:?}").to_lowercase(),
            "cr_gates": recipe.num_cr_gates(),
            "global_phase": recipe.global_phase,
            "recipe": recipe.instructions.iter().map(describe).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} Weyl decomposition of {}",
        style("→").cyan().bold(),
        style(standard.name()).green()
    );
    println!("  Coordinates:  {coordinates}");
    println!(
        "  Interactions: {}",
        coordinates.num_interactions(DEFAULT_ATOL)
    );
    println!(
        "  CR gates:     {} ({:?} echo)",
        style(recipe.num_cr_gates()).yellow(),
        echo_mode
    );
    println!("  Global phase: {:.6}", recipe.global_phase);
    println!("\n  Recipe:");
    for inst in &recipe.instructions {
        println!("    {}", describe(inst));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_qubit_gate_lookup() {
        assert!(matches!(two_qubit_gate("CX", &[]).unwrap(), StandardGate::CX));
        assert!(matches!(two_qubit_gate("rzz", &[0.3]).unwrap(), StandardGate::RZZ(_)));
    }

    #[test]
    fn test_single_qubit_gate_rejected() {
        let err = two_qubit_gate("h", &[]).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_unknown_gate_rejected() {
        assert!(two_qubit_gate("cx", &[0.1]).is_err());
        assert!(two_qubit_gate("nope", &[]).is_err());
    }
}
