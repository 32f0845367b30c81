//! NetSmog Agent - distributed latency probe worker
//!
//! Startup sequence:
//! - Load config (file + environment), read the shared secret
//! - Issue the authorisation token once for the whole process
//! - Fetch the assignment; anything but `200` is fatal
//! - One probing loop per target until SIGINT/SIGTERM

use anyhow::{Context, Result};
use netsmog_agent::shutdown::install_shutdown_handler;
use netsmog_agent::{AgentConfig, CoordinatorClient, EchoProber, Scheduler};
use netsmog_contracts::issue_with_cost;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("NetSmog Worker, version {}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load().await.context("loading agent config")?;
    config.validate()?;
    let secret = config.read_secret().await?;

    let worker = config.worker.clone();
    let cost = config.auth_cost;
    let token = tokio::task::spawn_blocking(move || issue_with_cost(&worker, &secret, cost))
        .await
        .context("token task")?
        .context("could not generate authorisation")?;

    let client = CoordinatorClient::new(&config.server, &config.worker, &token)?;
    info!(server = %client.url(), worker = %config.worker, "fetching configuration");
    let assignment = client
        .fetch_assignment()
        .await
        .context("could not fetch configuration")?;

    let targets: usize = assignment.values().map(|g| g.len()).sum();
    if targets == 0 {
        warn!(worker = %config.worker, "no targets assigned, idling until shutdown");
    } else {
        info!(worker = %config.worker, groups = assignment.len(), targets, "configuration received");
    }

    let shutdown = install_shutdown_handler()?;
    let scheduler = Scheduler::new(
        Arc::new(EchoProber::new()),
        Arc::new(client),
        config.probe_timeout(),
        shutdown.clone(),
    );
    let mut tasks = scheduler.spawn_all(&assignment);

    shutdown.cancelled().await;
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "probe loop panicked");
        }
    }
    info!("agent stopped");
    Ok(())
}
