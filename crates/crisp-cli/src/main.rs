//! Crisp Command-Line Interface
//!
//! The main entry point for the `crisp` tool.
//!
//! ```text
//!   circuit.json ──┐
//!                  ├──> crisp compile ──> circuit_compiled.json
//!   backend.yaml ──┘                      (basis gates + calibrated rzx)
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

use crisp_compile::EchoMode;

mod commands;

use commands::{backend, compile, version, weyl};

/// Crisp - pulse-efficient transpilation for cross-resonance backends
#[derive(Parser)]
#[command(name = "crisp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Echo placement for CR gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EchoArg {
    /// Two opposite-sign rzx gates around an x on the control
    Gate,
    /// One rzx per interaction with the echo inside its schedule
    Pulse,
}

impl From<EchoArg> for EchoMode {
    fn from(arg: EchoArg) -> Self {
        match arg {
            EchoArg::Gate => EchoMode::Gate,
            EchoArg::Pulse => EchoMode::Pulse,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a circuit for a cross-resonance backend
    Compile {
        /// Input circuit document (JSON)
        #[arg(short, long)]
        input: String,

        /// Backend description (YAML or JSON)
        #[arg(short, long)]
        backend: String,

        /// Output file (defaults to <input>_compiled.json)
        #[arg(short, long)]
        output: Option<String>,

        /// Override the backend's echo mode
        #[arg(long, value_enum)]
        echo_mode: Option<EchoArg>,

        /// Skip the final output verification
        #[arg(long)]
        no_verify: bool,
    },

    /// Show the Weyl coordinates and CR recipe of a two-qubit gate
    Weyl {
        /// Gate name (cx, cz, swap, iswap, rzz, rxx, crx, ...)
        gate: String,

        /// Gate parameters in radians
        #[arg(short, long, allow_negative_numbers = true)]
        param: Vec<f64>,

        /// Echo placement used for the recipe
        #[arg(long, value_enum, default_value = "gate")]
        echo_mode: EchoArg,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a synthetic backend description
    Backend {
        /// Number of qubits
        #[arg(short = 'n', long, default_value = "2")]
        qubits: u32,

        /// Native CR pairs as control-target (defaults to a linear chain)
        #[arg(short, long, value_parser = backend::parse_pair)]
        pair: Vec<(u32, u32)>,

        /// Backend name
        #[arg(long, default_value = "synthetic")]
        name: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Compile {
            input,
            backend,
            output,
            echo_mode,
            no_verify,
        } => compile::execute(
            &input,
            &backend,
            output.as_deref(),
            echo_mode.map(EchoMode::from),
            !no_verify,
        ),

        Commands::Weyl {
            gate,
            param,
            echo_mode,
            json,
        } => weyl::execute(&gate, &param, echo_mode.into(), json),

        Commands::Backend {
            qubits,
            pair,
            name,
            output,
        } => backend::execute(&name, qubits, &pair, output.as_deref()),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
