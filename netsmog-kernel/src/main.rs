/**
 * NETSMOG KERNEL - Point d'entrée du coordinateur
 *
 * RÔLE : Charge la config, les secrets et le backend de stockage, puis sert
 * l'API workers. SIGHUP recharge catalogue et secrets sans redémarrer.
 *
 * Erreurs fatales (diagnostic + code non nul) : config illisible ou invalide,
 * secrets illisibles, backend injoignable, port déjà pris.
 */

use anyhow::Context;
use netsmog_kernel::config::{config_path, KernelConfig};
use netsmog_kernel::reload::spawn_reload_on_sighup;
use netsmog_kernel::storage::build_store;
use netsmog_kernel::{build_router, load_config, AppState, Registry, SecretStore, Snapshot};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn log_summary(cfg: &KernelConfig) {
    tracing::info!(title = %cfg.main.title, maintainer = %cfg.main.maintainer, "NetSmog instance");
    for (id, worker) in &cfg.workers {
        tracing::info!(worker = %id, display = %worker.display, hostname = %worker.hostname, "worker");
    }
    for (name, group) in &cfg.targets {
        tracing::info!(group = %name, workers = ?group.workers, targets = group.targets.len(), "target group");
        for (target, conf) in &group.targets {
            tracing::debug!(group = %name, target = %target, host = %conf.host, "target");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = config_path();
    let cfg = load_config(&path)
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    log_summary(&cfg);

    let catalogue = cfg.catalogue().context("invalid target catalogue")?;
    tracing::info!(
        groups = catalogue.groups().len(),
        targets = catalogue.target_count(),
        "catalogue ready"
    );

    let secrets = SecretStore::load(&cfg.main.secrets)
        .await
        .context("cannot start without worker secrets")?;
    if secrets.is_empty() {
        tracing::warn!(path = %cfg.main.secrets.display(), "no worker secrets, every request will be refused");
    }

    let store = build_store(&cfg.storage).context("storage backend")?;
    store
        .ping()
        .await
        .with_context(|| format!("storage backend {} unreachable", store.name()))?;
    tracing::info!(backend = store.name(), "storage connected");

    let app_state = AppState {
        registry: Snapshot::new(Registry { catalogue, secrets }),
        store,
    };
    spawn_reload_on_sighup(path, app_state.registry.clone())?;

    let app = build_router(app_state);
    let listener = TcpListener::bind(&cfg.main.listen)
        .await
        .with_context(|| format!("cannot listen on {}", cfg.main.listen))?;
    tracing::info!(addr = %cfg.main.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}
