use std::process::ExitCode;

use clap::Parser;

use cypher_harness_cli::commands::start_server::{execute, StartServerArgs};
use cypher_harness_core::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = StartServerArgs::parse();
    cypher_harness_cli::init_tracing();

    let settings = Settings::from_env();
    tracing::debug!(?settings, "Resolved settings");

    match execute(args, &settings).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => cypher_harness_cli::report_error(&e),
    }
}
