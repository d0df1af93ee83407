//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - a quantum circuit transpiler",
        style("Qforge").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qforge-ir       Circuit intermediate representation");
    println!("  qforge-qasm     OpenQASM 2.0/3.0 parser and emitter");
    println!("  qforge-compile  Compilation and transpilation framework");
    println!("  qforge-cli      Command-line interface");
    println!();
    println!("Repository: {}", style("https://github.com/qforge-dev/qforge").underlined());
    println!("License:    {}", style("Apache-2.0").dim());
}
