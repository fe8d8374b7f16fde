//! Backend template command implementation.

use std::fs;

use anyhow::{Context, Result};
use console::style;

use crisp_compile::BackendConfig;

/// Parse a `control-target` pair such as `0-1` (`0,1` also accepted).
pub fn parse_pair(s: &str) -> Result<(u32, u32), String> {
    let (c, t) = s
        .split_once(['-', ','])
        .ok_or_else(|| format!("expected CONTROL-TARGET, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid qubit '{v}': {e}"))
    };
    let (c, t) = (parse(c)?, parse(t)?);
    if c == t {
        return Err(format!("pair '{s}' uses the same qubit twice"));
    }
    Ok((c, t))
}

/// Build the synthetic backend for `qubits` qubits.
///
/// Without explicit pairs the qubits form a chain `0-1, 1-2, ...`.
pub fn synthetic_backend(name: &str, qubits: u32, pairs: &[(u32, u32)]) -> Result<BackendConfig> {
    let pairs: Vec<(u32, u32)> = if pairs.is_empty() {
        (1..qubits).map(|q| (q - 1, q)).collect()
    } else {
        pairs.to_vec()
    };
    if let Some(&(c, t)) = pairs.iter().find(|&&(c, t)| c >= qubits || t >= qubits) {
        anyhow::bail!("Pair {c}-{t} is outside a {qubits}-qubit backend");
    }
    Ok(BackendConfig::synthetic(name, qubits, &pairs))
}

/// Execute the backend command.
pub fn execute(name: &str, qubits: u32, pairs: &[(u32, u32)], output: Option<&str>) -> Result<()> {
    let backend = synthetic_backend(name, qubits, pairs)?;
    let yaml = backend.to_yaml()?;

    match output {
        Some(path) => {
            fs::write(path, yaml).with_context(|| format!("Failed to write file: {path}"))?;
            eprintln!(
                "{} Wrote backend {} ({} qubits) to {}",
                style("✓").green().bold(),
                style(name).yellow(),
                qubits,
                style(path).green()
            );
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("0-1"), Ok((0, 1)));
        assert_eq!(parse_pair("3,2"), Ok((3, 2)));
        assert!(parse_pair("1").is_err());
        assert!(parse_pair("a-1").is_err());
        assert!(parse_pair("2-2").is_err());
    }

    #[test]
    fn test_default_chain() {
        let backend = synthetic_backend("chain", 3, &[]).unwrap();
        assert_eq!(backend.coupling_map, Some(vec![(0, 1), (1, 2)]));
    }

    #[test]
    fn test_pair_out_of_range() {
        assert!(synthetic_backend("bad", 2, &[(0, 2)]).is_err());
    }
}
