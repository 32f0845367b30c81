//! Agent configuration
//!
//! Handles:
//! - TOML file at `NETSMOG_AGENT_CONFIG` or the OS config dir
//! - Environment overrides (`NETSMOG_SERVER`, `NETSMOG_WORKER`, `NETSMOG_SECRET_FILE`)
//! - Reading the shared secret from its own file

use anyhow::{Context, Result};
use netsmog_contracts::auth::{MAX_VERIFY_COST, MIN_COST};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on a single probe, whatever the target interval.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no server specified")]
    NoServer,
    #[error("no shared secret file specified")]
    NoSecretFile,
    #[error("worker name is empty")]
    NoWorker,
    #[error("shared secret file {0} is empty")]
    EmptySecret(PathBuf),
    #[error("bcrypt cost {0} out of range {MIN_COST}..={MAX_VERIFY_COST}")]
    InvalidCost(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Kernel base URL, e.g. `http://netsmog.example.org:8080`.
    pub server: String,
    pub worker: String,
    pub secret_file: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    /// bcrypt work factor of the token sent to the kernel.
    pub auth_cost: u32,
}

fn default_worker() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            worker: default_worker(),
            secret_file: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            auth_cost: netsmog_contracts::auth::DEFAULT_COST,
        }
    }
}

impl AgentConfig {
    /// Load config from file (if any) then apply environment overrides.
    pub async fn load() -> Result<Self> {
        let path = match std::env::var_os("NETSMOG_AGENT_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => Self::config_file_path()?,
        };
        let mut config = Self::load_from(&path).await?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no agent config file, using defaults");
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Get OS-specific config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("netsmog-agent");
        path.push("config.toml");
        Ok(path)
    }

    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = var("NETSMOG_SERVER") {
            self.server = server;
        }
        if let Some(worker) = var("NETSMOG_WORKER") {
            self.worker = worker;
        }
        if let Some(secret) = var("NETSMOG_SECRET_FILE") {
            self.secret_file = Some(PathBuf::from(secret));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::NoServer);
        }
        if self.secret_file.is_none() {
            return Err(ConfigError::NoSecretFile);
        }
        if self.worker.trim().is_empty() {
            return Err(ConfigError::NoWorker);
        }
        if !(MIN_COST..=MAX_VERIFY_COST).contains(&self.auth_cost) {
            return Err(ConfigError::InvalidCost(self.auth_cost));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Reads the shared secret, surrounding whitespace removed.
    pub async fn read_secret(&self) -> Result<String> {
        let path = self.secret_file.as_ref().ok_or(ConfigError::NoSecretFile)?;
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read shared secret {}", path.display()))?;
        let secret = raw.trim();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret(path.clone()).into());
        }
        Ok(secret.to_string())
    }
}
