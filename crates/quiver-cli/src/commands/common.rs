//! Shared helpers for CLI commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use quiver_sim::{SimulationReport, Snapshot};

/// Rows shown before the histogram is cut off.
const MAX_ROWS: usize = 16;

/// Read a whole program from stdin.
pub fn read_stdin() -> Result<String> {
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("Failed to read circuit from stdin")?;
    Ok(source)
}

/// Fail early with a readable message for a missing input file.
pub fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(())
}

/// Print the report as pretty JSON on stdout.
pub fn print_json(report: &SimulationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

/// Print the report for humans.
#[allow(clippy::cast_precision_loss)]
pub fn print_table(report: &SimulationReport) {
    for dump in &report.probability_dumps {
        print!("{dump}");
    }

    println!(
        "\n{} Results ({} shots, seed {}):",
        style("✓").green().bold(),
        report.shots,
        report.seed
    );

    let mut sorted: Vec<_> = report.counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let total = f64::from(report.total_counts());

    for (bitstring, count) in sorted.iter().take(MAX_ROWS) {
        let prob = f64::from(**count) / total * 100.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > MAX_ROWS {
        println!("  ... and {} more outcomes", sorted.len() - MAX_ROWS);
    }

    for (label, snapshot) in &report.snapshots {
        print_snapshot(label, snapshot);
    }

    if let Some(stats) = &report.stats {
        println!("\n{}", style("Statistics:").bold());
        println!("  Qubits:           {}", stats.qubits);
        println!("  Applied gates:    {}", stats.applied_gates);
        println!("  Max active nodes: {}", stats.max_active_nodes);
        println!(
            "  Simulation time:  {} s",
            style(format!("{:.6}", stats.simulation_time)).yellow()
        );
    }
}

fn print_snapshot(label: &str, snapshot: &Snapshot) {
    println!("\n{} {}", style("Snapshot").bold(), style(label).cyan());
    if let Some(amplitudes) = &snapshot.statevector {
        for (i, a) in amplitudes.iter().enumerate() {
            println!("  [{i}] {:+.6} {:+.6}i", a.re, a.im);
        }
    }
    if let Some(ket) = &snapshot.probabilities_ket {
        for (bits, p) in ket {
            println!("  |{bits}>: {p:.6}");
        }
    }
}
