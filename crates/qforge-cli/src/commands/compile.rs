//! Compile command implementation.

use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;

use qforge_compile::{transpile, Topology};

use super::common::{get_target_properties, load_circuit, parse_algorithm};

/// Execute the compile (transpile) command.
pub fn execute(
    input: &str,
    output: Option<&str>,
    target: &str,
    algorithm: &str,
    optimization_level: u8,
) -> Result<()> {
    println!(
        "{} Transpiling {} for target {}",
        style("→").cyan().bold(),
        style(input).green(),
        style(target).yellow()
    );

    let circuit = load_circuit(input)?;
    println!("  Loaded: {} qubits, depth {}", circuit.num_qubits(), circuit.depth());

    let (coupling_map, basis_gates) = get_target_properties(target)?;
    let algorithm = parse_algorithm(algorithm)?;
    let topology = Topology::new(target, coupling_map, basis_gates);

    println!("  Routing with {algorithm:?}, verification {}", optimization_level >= 1);

    let result = transpile(circuit, &topology, algorithm)?;

    println!("{} Transpilation complete", style("✓").green().bold());
    println!(
        "  Result: depth {} (was {}), {} SWAPs inserted",
        result.metrics.transpiled_depth, result.metrics.original_depth, result.router_stats.n_swap_gates
    );
    println!(
        "  Estimated fidelity: gate {:.4}, overall {:.4}",
        result.metrics.gate_fidelity, result.metrics.fidelity
    );

    let output_path = output.map(str::to_string).unwrap_or_else(|| {
        let p = Path::new(input);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        format!("{stem}_compiled.qasm")
    });

    fs::write(&output_path, &result.transpiled_qasm2)
        .with_context(|| format!("Failed to write file: {output_path}"))?;
    println!("  Output: {}", style(&output_path).green());

    Ok(())
}
