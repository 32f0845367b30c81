/*!
Test Harness pour le kernel et l'agent NetSmog

Facilite l'écriture de tests d'intégration avec:
- Répertoire temporaire pour config kernel et fichiers de secrets
- Tokens d'autorisation à coût bcrypt minimal
- Démarrage d'un router HTTP sur un port éphémère
*/

use anyhow::{Context, Result};
use netsmog_contracts::{issue_with_cost, AuthToken};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Coût bcrypt des tokens de test (minimum accepté).
pub const TEST_COST: u32 = 4;

pub struct TestHarness {
    dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        // logs visibles avec `cargo test -- --nocapture`
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
        let dir = tempfile::tempdir().context("creating test directory")?;
        Ok(Self { dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Écrit `secrets.toml` (`worker = "secret"`).
    pub fn write_secrets(&self, secrets: &[(&str, &str)]) -> Result<PathBuf> {
        let table: toml::Table = secrets
            .iter()
            .map(|(worker, secret)| (worker.to_string(), toml::Value::String(secret.to_string())))
            .collect();
        self.write_file("secrets.toml", &toml::to_string(&table)?)
    }

    pub fn write_kernel_config(&self, yaml: &str) -> Result<PathBuf> {
        self.write_file("kernel.yaml", yaml)
    }

    /// Token valide pour `worker`, émis au coût de test.
    pub fn token(&self, worker: &str, secret: &str) -> Result<AuthToken> {
        Ok(issue_with_cost(worker, secret, TEST_COST)?)
    }

    /// Sert `router` sur 127.0.0.1 (port éphémère) jusqu'à la fin du runtime de test.
    pub async fn serve(&self, router: axum::Router) -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "test server stopped");
            }
        });
        Ok(addr)
    }
}
