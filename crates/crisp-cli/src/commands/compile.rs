//! Compile command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crisp_compile::{EchoMode, Pipeline};
use crisp_ir::CircuitDocument;

use super::common::{default_output_path, load_backend, load_circuit};

/// Execute the compile command.
pub fn execute(
    input: &str,
    backend: &str,
    output: Option<&str>,
    echo_mode: Option<EchoMode>,
    verify: bool,
) -> Result<()> {
    let mut backend_config = load_backend(backend)?;
    if let Some(mode) = echo_mode {
        backend_config.echo_mode = mode;
    }

    println!(
        "{} Compiling {} for backend {}",
        style("→").cyan().bold(),
        style(input).green(),
        style(&backend_config.name).yellow()
    );

    let circuit = load_circuit(input)?;
    println!(
        "  Loaded: {} qubits, depth {}, {} ops",
        circuit.num_qubits(),
        circuit.depth(),
        circuit.dag().num_ops()
    );

    let config = backend_config
        .pipeline_config()
        .context("Failed to configure the pipeline")?
        .with_verification(verify);
    let pipeline = Pipeline::pulse_efficient(config);
    info!(
        "Echo mode {:?}, stages: {}",
        backend_config.echo_mode,
        pipeline.stage_names().join(", ")
    );

    let name = circuit.name().to_string();
    let (dag, report) = pipeline
        .run(circuit.into_dag())
        .with_context(|| format!("Compilation of {input} failed"))?;

    println!("{} Compilation complete", style("✓").green().bold());
    println!("{report}");
    let cr_samples: u64 = dag
        .ops()
        .filter_map(|(_, inst)| dag.calibration_for(inst))
        .map(|schedule| schedule.duration())
        .sum();
    println!(
        "  Result: depth {}, {} ops, {} samples of calibrated pulses",
        dag.depth(),
        dag.num_ops(),
        cr_samples
    );

    let output_path = output.map_or_else(|| default_output_path(input), PathBuf::from);
    let document = CircuitDocument::from_dag(name, &dag)?;
    fs::write(&output_path, document.to_json_pretty()?)
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;
    println!("  Output: {}", style(output_path.display()).green());

    Ok(())
}
