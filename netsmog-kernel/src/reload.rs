//! Rechargement à chaud du catalogue et des secrets (SIGHUP).

use crate::config::load_config;
use crate::secrets::SecretStore;
use crate::state::{Registry, Snapshot};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Relit la config et le fichier de secrets puis remplace le registre en une
/// seule écriture. En cas d'erreur (fichier absent compris) rien n'est remplacé.
pub async fn reload(path: &Path, registry: &Snapshot<Registry>) -> anyhow::Result<()> {
    let cfg = load_config(path).await.context("reading kernel config")?;
    let next_catalogue = cfg.catalogue().context("building target catalogue")?;
    let next_secrets = SecretStore::load(&cfg.main.secrets)
        .await
        .context("reading secrets")?;

    tracing::info!(
        groups = next_catalogue.groups().len(),
        targets = next_catalogue.target_count(),
        workers = next_secrets.len(),
        "configuration reloaded"
    );
    registry.replace(Registry {
        catalogue: next_catalogue,
        secrets: next_secrets,
    });
    Ok(())
}

#[cfg(unix)]
pub fn spawn_reload_on_sighup(path: PathBuf, registry: Snapshot<Registry>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            tracing::info!(path = %path.display(), "SIGHUP received, reloading");
            if let Err(e) = reload(&path, &registry).await {
                tracing::error!(error = %format!("{e:#}"), "reload failed, keeping previous configuration");
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn spawn_reload_on_sighup(_path: PathBuf, _registry: Snapshot<Registry>) -> anyhow::Result<()> {
    tracing::warn!("SIGHUP reload not available on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsmog_devkit::TestHarness;

    fn kernel_yaml(secrets: &Path, host: &str) -> String {
        format!(
            "main:\n  secrets: {}\ntargets:\n  g1:\n    targets:\n      t1:\n        host: {host}\n",
            secrets.display()
        )
    }

    fn host_of(registry: &Snapshot<Registry>) -> String {
        registry.load().catalogue.group("g1").unwrap().targets["t1"].host.clone()
    }

    #[tokio::test]
    async fn test_reload_swaps_registry() {
        let harness = TestHarness::new().unwrap();
        let secrets_path = harness.write_secrets(&[("w1", "hunter2")]).unwrap();
        let cfg_path = harness
            .write_kernel_config(&kernel_yaml(&secrets_path, "192.0.2.1"))
            .unwrap();

        let registry = Snapshot::new(Registry::default());
        reload(&cfg_path, &registry).await.unwrap();

        let current = registry.load();
        assert_eq!(current.catalogue.group("g1").unwrap().targets["t1"].host, "192.0.2.1");
        assert_eq!(current.secrets.lookup("w1").as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let harness = TestHarness::new().unwrap();
        let secrets_path = harness.write_secrets(&[("w1", "hunter2")]).unwrap();
        let cfg_path = harness
            .write_kernel_config(&kernel_yaml(&secrets_path, "192.0.2.1"))
            .unwrap();

        let registry = Snapshot::new(Registry::default());
        reload(&cfg_path, &registry).await.unwrap();

        // invalid target: count 0
        harness
            .write_kernel_config(&format!(
                "{}        count: 0\n",
                kernel_yaml(&secrets_path, "192.0.2.99")
            ))
            .unwrap();
        assert!(reload(&cfg_path, &registry).await.is_err());
        assert_eq!(host_of(&registry), "192.0.2.1");

        // secrets file gone: registry untouched
        std::fs::remove_file(&secrets_path).unwrap();
        harness
            .write_kernel_config(&kernel_yaml(&secrets_path, "192.0.2.2"))
            .unwrap();
        assert!(reload(&cfg_path, &registry).await.is_err());
        assert_eq!(host_of(&registry), "192.0.2.1");
        assert!(registry.load().secrets.lookup("w1").is_some());
    }

    #[tokio::test]
    async fn test_deleted_config_keeps_previous() {
        let harness = TestHarness::new().unwrap();
        let secrets_path = harness.write_secrets(&[("w1", "hunter2")]).unwrap();
        let cfg_path = harness
            .write_kernel_config(&kernel_yaml(&secrets_path, "192.0.2.1"))
            .unwrap();

        let registry = Snapshot::new(Registry::default());
        reload(&cfg_path, &registry).await.unwrap();

        std::fs::remove_file(&cfg_path).unwrap();
        let err = reload(&cfg_path, &registry).await.unwrap_err();
        assert!(format!("{err:#}").contains("cannot read"), "{err:#}");

        let current = registry.load();
        assert_eq!(current.catalogue.target_count(), 1);
        assert_eq!(host_of(&registry), "192.0.2.1");
        assert_eq!(current.secrets.lookup("w1").as_deref(), Some("hunter2"));
    }
}
