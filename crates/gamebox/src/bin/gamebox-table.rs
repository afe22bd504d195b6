//! `gamebox-table`: one shared table, optionally listed in a registry.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use gamebox::cli::ServeArgs;
use gamebox::{Announcer, Server, TableService, logging, shutdown};
use gamebox_transport::WebSocketHost;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gamebox table server", long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    /// Registry to announce to, e.g. `ws://registry.example:13355`.
    /// Overrides `announce.registry_url`.
    #[arg(long, value_name = "URL")]
    announce: Option<String>,

    /// Name shown in server lists. Overrides `announce.name`.
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, found) = match cli.serve.load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("gamebox-table: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = cli.announce {
        config.announce.registry_url = Some(url);
    }
    if let Some(name) = cli.name {
        config.announce.name = name;
    }

    if let Err(e) = logging::init(&config.logging.level, config.logging.json) {
        eprintln!("gamebox-table: cannot initialize logging: {e}");
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

    let rate = config.table.animation_rate_hz;
    let service = TableService::new(config.table);

    if let Some(url) = config.announce.registry_url {
        let announcer = Announcer::new(
            url,
            host.local_addr().port(),
            config.announce.name,
            Duration::from_secs(config.announce.heartbeat_secs),
            service.subscribe_players(),
        );
        tokio::spawn(announcer.run());
    }

    tracing::info!(%addr, animation_rate_hz = rate, "table server starting");

    let result = Server::new(host, service)
        .with_frame_rate(rate)
        .with_poll_interval(Duration::from_millis(config.network.poll_interval_ms))
        .run(shutdown::shutdown_signal())
        .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "table server stopped");
            ExitCode::FAILURE
        }
    }
}
