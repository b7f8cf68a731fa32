use std::process::ExitCode;

use clap::Parser;

use cypher_harness_cli::commands::test_auth::{execute, TestAuthArgs};
use cypher_harness_core::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = TestAuthArgs::parse();
    cypher_harness_cli::init_tracing();

    let settings = Settings::from_env();
    tracing::debug!(?settings, "Resolved settings");

    execute(args, &settings).await
}
