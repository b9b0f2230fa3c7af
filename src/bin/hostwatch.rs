use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hostwatch::{
    config::read_config_file, monitors::system::SysinfoCollector,
    notifications::NotificationManager,
};
use tokio::sync::watch;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Sends host resource alerts to Telegram")]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("hostwatch", LevelFilter::DEBUG),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)
        .with_context(|| format!("failed to load config from {}", args.file))?;

    let manager = Arc::new(NotificationManager::new(
        config.telegram,
        Arc::new(SysinfoCollector::new()),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    manager.start(shutdown_rx).await;

    #[cfg(feature = "api")]
    if let Some(api) = config.api {
        use hostwatch::api::{ApiConfig, ApiState, spawn_api_server};

        let api_config = ApiConfig {
            bind_addr: std::net::SocketAddr::new(api.addr, api.port),
            auth_token: api.token.or_else(hostwatch::util::get_secret),
            enable_cors: api.cors,
        };
        spawn_api_server(api_config, ApiState::new(manager.clone())).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down");
    // receivers may already be gone
    let _ = shutdown_tx.send(true);
    manager.stop().await;

    Ok(())
}
