//! `gamebox-registry`: the server list that table servers announce to.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use gamebox::cli::ServeArgs;
use gamebox::{RegistryService, Server, logging, shutdown};
use gamebox_transport::WebSocketHost;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gamebox server registry", long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, found) = match cli.serve.load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("gamebox-registry: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.logging.level, config.logging.json) {
        eprintln!("gamebox-registry: cannot initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    if !found {
        tracing::info!(path = %cli.serve.config.display(), "no configuration file, using defaults");
    }

    let port = match cli.serve.port(&config) {
        Ok(port) => port,
        Err(e) => {
            tracing::error!(error = %e, "no listen port");
            return ExitCode::FAILURE;
        }
    };
    let addr = format!("{}:{}", config.network.bind_address, port);
    let host = match WebSocketHost::bind(&addr, config.network.max_connections).await {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(%addr, error = %e, "cannot listen");
            return ExitCode::FAILURE;
        }
    };

    let seeds = config.registry.servers.len();
    tracing::info!(%addr, seeds, ttl_secs = config.registry.record_ttl_secs, "registry starting");

    let result = Server::new(host, RegistryService::new(config.registry))
        .with_poll_interval(Duration::from_millis(config.network.poll_interval_ms))
        .run(shutdown::shutdown_signal())
        .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "registry stopped");
            ExitCode::FAILURE
        }
    }
}
