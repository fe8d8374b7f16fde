//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - pulse-efficient transpilation for cross-resonance backends",
        style("Crisp").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  crisp-pulse    Channels, waveforms, schedules and CR stretching");
    println!("  crisp-ir       Circuit DAG, gates and calibrations");
    println!("  crisp-compile  Weyl decomposition, calibration and basis translation");
    println!("  crisp-cli      Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
