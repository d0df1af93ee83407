//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use qforge_compile::{Algorithm, BasisGates, CouplingMap};
use qforge_ir::Circuit;
use qforge_qasm::parse;

/// Load a circuit from a QASM file.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source = fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;

    parse(&source).map_err(|e| anyhow::anyhow!("Parse error: {e}"))
}

/// Get target coupling map and basis gates for a named topology.
pub fn get_target_properties(target: &str) -> Result<(CouplingMap, BasisGates)> {
    match target.to_lowercase().as_str() {
        "iqm" | "iqm5" => Ok((CouplingMap::star(5), BasisGates::iqm())),
        "iqm20" => Ok((CouplingMap::star(20), BasisGates::iqm())),
        "ibm" | "ibm5" => Ok((CouplingMap::linear(5), BasisGates::ibm())),
        "ibm27" => Ok((CouplingMap::linear(27), BasisGates::ibm())),
        "ibm_torino" | "ibm_fez" | "ibm_marrakesh" => Ok((CouplingMap::linear(133), BasisGates::heron())),
        "simulator" | "sim" => Ok((CouplingMap::full(20), BasisGates::universal())),
        "rigetti" | "ankaa" => Ok((CouplingMap::linear(84), BasisGates::new(["rx", "rz", "cz"]))),
        "ionq" | "aria" => Ok((CouplingMap::full(25), BasisGates::new(["rx", "ry", "rz", "xx"]))),
        other => {
            anyhow::bail!(
                "Unknown target: '{other}'. Available: iqm, iqm5, iqm20, ibm, ibm5, ibm27, \
                 ibm_torino, ibm_fez, ibm_marrakesh, simulator, rigetti, ionq"
            );
        }
    }
}

/// Parse the `--algorithm` flag into an [`Algorithm`].
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name.to_lowercase().replace('_', "-").as_str() {
        "naive" => Ok(Algorithm::Naive),
        "dynamic" => Ok(Algorithm::Dynamic),
        "sabre" => Ok(Algorithm::Sabre),
        "calibration-aware" | "calibration" => Ok(Algorithm::CalibrationAware),
        other => anyhow::bail!("Unknown algorithm: '{other}'. Available: naive, dynamic, sabre, calibration-aware"),
    }
}
