//! quiver command-line interface
//!
//! Simulates an `OpenQASM` 2.0 program with decision diagrams and reports the
//! measured histogram.
//!
//! ```text
//! quiver bell.qasm --shots 1000 --seed 7
//! cat bell.qasm | quiver --format table
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::simulate;

/// quiver - decision-diagram simulation of `OpenQASM` 2.0 circuits
#[derive(Parser)]
#[command(name = "quiver")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Circuit file (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Number of shots
    #[arg(short, long)]
    shots: Option<u32>,

    /// Seed of the random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Tolerance for merging complex weights
    #[arg(long)]
    precision: Option<f64>,

    /// Allowed deviation of the total probability from 1
    #[arg(long)]
    tolerance: Option<f64>,

    /// Record amplitudes at snapshot statements
    #[arg(long)]
    display_statevector: bool,

    /// Record probabilities at snapshot statements
    #[arg(long)]
    display_probabilities: bool,

    /// Print simulation statistics
    #[arg(long = "ps")]
    print_stats: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let overrides = simulate::Overrides {
        shots: cli.shots,
        seed: cli.seed,
        precision: cli.precision,
        tolerance: cli.tolerance,
        display_statevector: cli.display_statevector,
        display_probabilities: cli.display_probabilities,
        print_stats: cli.print_stats,
    };

    let result = simulate::execute(
        cli.input.as_deref(),
        cli.config.as_deref(),
        &overrides,
        cli.format == OutputFormat::Table,
    );

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
