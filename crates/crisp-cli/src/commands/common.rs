//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crisp_compile::BackendConfig;
use crisp_ir::{Circuit, CircuitDocument};

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn read_source(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Load a circuit from a JSON circuit document.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    let source = read_source(path)?;
    let document = CircuitDocument::from_json(&source)
        .with_context(|| format!("Invalid circuit document: {path}"))?;
    document
        .to_circuit()
        .with_context(|| format!("Failed to build circuit from {path}"))
}

/// Load a backend description, YAML unless the file ends in `.json`.
pub fn load_backend(path: &str) -> Result<BackendConfig> {
    let source = read_source(path)?;
    let backend = match extension(Path::new(path)).as_str() {
        "json" => BackendConfig::from_json(&source),
        _ => BackendConfig::from_yaml(&source),
    };
    backend.with_context(|| format!("Invalid backend description: {path}"))
}

/// `<dir>/<stem>_compiled.json` next to the input file.
pub fn default_output_path(input: &str) -> PathBuf {
    let path = Path::new(input);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{stem}_compiled.json"))
}
