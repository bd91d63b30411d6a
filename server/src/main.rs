use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use duosweep_server::config::{Cli, ServerConfig};
use duosweep_server::connection::SystemClock;
use duosweep_server::coordinator::Coordinator;
use duosweep_server::registry::Registry;
use duosweep_server::transport;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::resolve(&cli)?;
    log::debug!("{config:?}");

    let registry = Arc::new(Registry::new(config.idle_policy(), config.seed));
    let coordinator = Arc::new(Coordinator::new(registry, Arc::new(SystemClock)));

    let sweeper = {
        let coordinator = Arc::clone(&coordinator);
        let mut interval = tokio::time::interval(config.sweep_interval());
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                coordinator.sweep();
            }
        })
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Could not bind {}", config.bind))?;
    log::info!("Listening on {}", config.bind);

    axum::serve(listener, transport::router(Arc::clone(&coordinator)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    sweeper.abort();
    coordinator.shutdown();
    log::info!("Server shut down gracefully");
    Ok(())
}
