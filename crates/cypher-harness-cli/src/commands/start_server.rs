use clap::Parser;

use cypher_harness_core::error::HarnessResult;
use cypher_harness_core::{provision, ConnectionConfig, Settings};
use cypher_harness_launch::{build_image, run_container, run_local, ContainerRun, LaunchOutcome, ShutdownSignal};

#[derive(Parser, Debug)]
#[command(
    name = "cypher-start-server",
    about = "Start MCP Neo4j Cypher server with API authentication",
    version
)]
pub struct StartServerArgs {
    /// Run the server in a Docker container instead of locally
    #[arg(long)]
    pub docker: bool,
}

pub async fn execute(args: StartServerArgs, settings: &Settings) -> HarnessResult<LaunchOutcome> {
    crate::banner("MCP Neo4j Cypher Server - HTTP Mode with Authentication");

    let config = provision(&settings.env_file)?;
    println!("✓ Updated .env file with API key");

    let shutdown = ShutdownSignal::on_ctrl_c();
    let outcome = if args.docker {
        start_docker(&config, settings, shutdown).await?
    } else {
        start_local(&config, settings, shutdown).await?
    };

    if outcome == LaunchOutcome::Interrupted {
        println!("\n\n✓ Server stopped");
    }
    Ok(outcome)
}

fn print_connection(url: &str, api_key: &str) {
    println!("Server URL: {url}");
    println!("API Key: {api_key}");
    println!("\nPress Ctrl+C to stop the server\n");
}

async fn start_local(
    config: &ConnectionConfig,
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    println!("Starting MCP Neo4j Cypher server...");
    print_connection(&config.server_url(), &config.api_key);
    run_local(config, settings, shutdown).await
}

async fn start_docker(
    config: &ConnectionConfig,
    settings: &Settings,
    shutdown: ShutdownSignal,
) -> HarnessResult<LaunchOutcome> {
    println!("Starting MCP Neo4j Cypher server in Docker...");
    println!();
    println!("Building Docker image: {}", settings.docker_image);
    println!("Building from: {}", settings.project_dir.display());
    println!();

    if build_image(settings, shutdown.clone()).await? == LaunchOutcome::Interrupted {
        return Ok(LaunchOutcome::Interrupted);
    }
    println!("✓ Docker image built successfully");
    println!();

    let run = ContainerRun::plan(config, settings);
    if let Some(ref uri) = run.rewritten_uri {
        println!("⚠️  Modified Neo4j URI for Docker: {uri}");
        println!();
    }
    print_connection(&run.advertised_url, &config.api_key);
    run_container(&run, settings, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use cypher_harness_core::HarnessError;

    #[test]
    fn only_docker_flag() {
        StartServerArgs::command().debug_assert();
        assert!(!StartServerArgs::try_parse_from(["cypher-start-server"]).unwrap().docker);
        assert!(StartServerArgs::try_parse_from(["cypher-start-server", "--docker"]).unwrap().docker);
        assert!(StartServerArgs::try_parse_from(["cypher-start-server", "--port", "1"]).is_err());
    }

    #[tokio::test]
    async fn incomplete_env_file_aborts_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "NEO4J_URI=bolt://localhost:7687\n").unwrap();
        let settings = Settings {
            env_file: env_file.clone(),
            server_command: vec!["definitely-not-run".into()],
            ..Settings::from_lookup(|_| None)
        };

        let err = execute(StartServerArgs { docker: false }, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::MissingFields { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            std::fs::read_to_string(&env_file).unwrap(),
            "NEO4J_URI=bolt://localhost:7687\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn local_run_rotates_key_and_starts_server() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "NEO4J_URI=bolt://localhost:7687\nNEO4J_USERNAME=neo4j\nNEO4J_PASSWORD=pw\nNEO4J_API_KEY=old\n",
        )
        .unwrap();
        let settings = Settings {
            env_file: env_file.clone(),
            project_dir: dir.path().to_path_buf(),
            server_command: vec!["sh".into(), "-c".into(), "test \"$NEO4J_API_KEY\" != old".into()],
            ..Settings::from_lookup(|_| None)
        };

        let outcome = execute(StartServerArgs { docker: false }, &settings).await.unwrap();
        assert_eq!(outcome, LaunchOutcome::Exited);
        let written = cypher_harness_core::EnvFile::from_file(&env_file).unwrap();
        assert_ne!(written.get("NEO4J_API_KEY"), Some("old"));
    }
}
