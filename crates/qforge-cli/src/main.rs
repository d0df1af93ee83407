//! Qforge Command-Line Interface
//!
//! The entry point for the Qforge transpiler CLI.

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{compile, version};

/// Qforge - a quantum circuit transpiler
#[derive(Parser)]
#[command(name = "qforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile a circuit for a target topology
    Compile {
        /// Input file (OpenQASM 2.0/3.0)
        #[arg(short, long)]
        input: String,

        /// Output file for the transpiled QASM (defaults to `<stem>_compiled.qasm`)
        #[arg(short, long)]
        output: Option<String>,

        /// Target topology (iqm, iqm20, ibm, ibm27, ibm_torino, simulator, rigetti, ionq)
        #[arg(short, long, default_value = "simulator")]
        target: String,

        /// Routing algorithm (naive, dynamic, sabre, calibration-aware)
        #[arg(short, long, default_value = "sabre")]
        algorithm: String,

        /// Run post-routing structural verification (0 = skip, 1 = verify)
        #[arg(long, default_value = "1")]
        optimization_level: u8,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
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
            output,
            target,
            algorithm,
            optimization_level,
        } => compile::execute(&input, output.as_deref(), &target, &algorithm, optimization_level),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
