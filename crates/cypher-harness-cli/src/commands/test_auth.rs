use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use cypher_harness_core::{HarnessError, Settings};
use cypher_harness_launch::{
    build_probe_image, run_probe_container, LaunchOutcome, ProbeContainerRun, ShutdownSignal,
};
use cypher_harness_probe::probe::key_preview;
use cypher_harness_probe::{
    load_api_key, ApiKeyLookup, CapabilitySession, McpHttpSession, ProbeFailure, ProbeReport,
    ProbeRunner, DEFAULT_ENDPOINT,
};

const RUN_SERVER_FIRST: &str = "Please run cypher-start-server first to generate API key";

#[derive(Parser, Debug)]
#[command(
    name = "cypher-test-auth",
    about = "Test MCP Neo4j Cypher client with API authentication",
    version
)]
pub struct TestAuthArgs {
    /// Run the client in a Docker container instead of locally
    #[arg(long)]
    pub docker: bool,
}

pub async fn execute(args: TestAuthArgs, settings: &Settings) -> ExitCode {
    if args.docker {
        return run_in_docker(settings).await;
    }

    crate::banner("MCP Neo4j Cypher Client - Authentication Demo");
    let mut stdout = std::io::stdout();
    let result = probe_with_env_file(
        &settings.env_file,
        |key| McpHttpSession::new(DEFAULT_ENDPOINT, key),
        &mut stdout,
    )
    .await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(ProbeRunError::Config(e)) => crate::report_error(&e),
        Err(ProbeRunError::Session(failure)) => {
            print_session_failure(&failure, &mut stdout);
            ExitCode::FAILURE
        }
    }
}

fn print_session_failure<W: Write>(failure: &ProbeFailure, out: &mut W) {
    let _ = writeln!(
        out,
        "✗ Error: {failure}\n\n\
         Troubleshooting:\n\
         1. Ensure cypher-start-server is running in another terminal\n\
         2. Check that server is listening on {DEFAULT_ENDPOINT}\n\
         3. Verify API key matches between .env and running server"
    );
}

#[derive(Debug)]
pub enum ProbeRunError {
    Config(HarnessError),
    Session(ProbeFailure),
}

/// Load the key from `env_file` and run one probe session against the
/// session `open` builds. A missing file or key is reported on `out` and
/// yields `Ok(None)` without opening a session.
pub async fn probe_with_env_file<S, F, W>(
    env_file: &Path,
    open: F,
    out: &mut W,
) -> Result<Option<ProbeReport>, ProbeRunError>
where
    S: CapabilitySession,
    F: FnOnce(String) -> S,
    W: Write,
{
    let lookup = load_api_key(env_file, |k| std::env::var(k).ok()).map_err(ProbeRunError::Config)?;
    let key = match lookup {
        ApiKeyLookup::Found(key) => key,
        ApiKeyLookup::FileMissing(_) => {
            let _ = writeln!(out, "✗ .env file not found\n{RUN_SERVER_FIRST}");
            return Ok(None);
        }
        ApiKeyLookup::KeyMissing(_) => {
            let _ = writeln!(out, "✗ NEO4J_API_KEY not found in .env\n{RUN_SERVER_FIRST}");
            return Ok(None);
        }
    };

    let _ = writeln!(out, "✓ Loaded API key from .env: {}\n", key_preview(&key));
    let mut session = open(key);
    let _ = writeln!(out, "✓ Configured transport: {DEFAULT_ENDPOINT}\n");

    let report = ProbeRunner::new(&mut session, out)
        .run()
        .await
        .map_err(ProbeRunError::Session)?;

    let bar = "=".repeat(60);
    let _ = writeln!(out, "{bar}\n✓ Client demo completed successfully\n{bar}");
    Ok(Some(report))
}

async fn run_in_docker(settings: &Settings) -> ExitCode {
    crate::banner("Running MCP Client in Docker Container");

    let key = match load_api_key(&settings.env_file, |k| std::env::var(k).ok()) {
        Ok(ApiKeyLookup::Found(key)) => key,
        Ok(ApiKeyLookup::FileMissing(_)) => {
            println!("✗ .env file not found\n{RUN_SERVER_FIRST}");
            return ExitCode::FAILURE;
        }
        Ok(ApiKeyLookup::KeyMissing(_)) => {
            println!("✗ NEO4J_API_KEY not found in .env\n{RUN_SERVER_FIRST}");
            return ExitCode::FAILURE;
        }
        Err(e) => return crate::report_error(&e),
    };
    println!("✓ Loaded API key from .env: {}\n", key_preview(&key));

    let env_file = match std::fs::canonicalize(&settings.env_file) {
        Ok(p) => p,
        Err(source) => {
            return crate::report_error(&HarnessError::Io {
                path: settings.env_file.clone(),
                source,
            })
        }
    };

    println!("Building Docker image: {}", settings.probe_image);
    println!("Building from: {}", settings.probe_context.display());
    println!();
    let shutdown = ShutdownSignal::on_ctrl_c();
    match build_probe_image(settings, shutdown.clone()).await {
        Ok(LaunchOutcome::Exited) => println!("✓ Docker image built successfully\n"),
        Ok(LaunchOutcome::Interrupted) => return ExitCode::SUCCESS,
        Err(e) => return crate::report_error(&e),
    }

    let run = ProbeContainerRun::plan(&key, &env_file, settings);
    println!("Starting Docker container...");
    println!(
        "Command: {} {} ... {} ...",
        settings.container_runtime,
        run.args[..4].join(" "),
        settings.probe_image
    );
    println!();

    match run_probe_container(&run, settings, shutdown).await {
        Ok(LaunchOutcome::Exited) | Ok(LaunchOutcome::Interrupted) => ExitCode::SUCCESS,
        Err(e) => {
            if let HarnessError::ChildFailed { code, .. } = &e {
                println!("\n✗ Docker execution failed with exit code {code}");
                println!("\nTroubleshooting:");
                println!("1. Ensure Docker is installed and running");
                println!("2. Ensure the MCP server is running (cypher-start-server)");
                println!("3. Check that the .env file contains a valid API key");
                return ExitCode::from(e.exit_code());
            }
            crate::report_error(&e)
        }
    }
}
