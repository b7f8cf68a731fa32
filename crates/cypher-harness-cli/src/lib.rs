use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use cypher_harness_core::HarnessError;

pub mod commands;

/// Log to stderr, filtered by `RUST_LOG` (default `warn`) so the console
/// report on stdout stays readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn banner(title: &str) {
    let bar = "=".repeat(60);
    println!("{bar}");
    println!("{title}");
    println!("{bar}");
    println!();
}

/// Print `err` with its remediation hint and turn it into an exit code.
pub fn report_error(err: &HarnessError) -> ExitCode {
    eprintln!("✗ {err}");
    if let Some(hint) = err.hint() {
        eprintln!("{hint}");
    }
    ExitCode::from(err.exit_code())
}
