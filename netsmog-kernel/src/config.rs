/**
 * CONFIG KERNEL - Chargement et validation de la configuration NetSmog
 *
 * RÔLE : Lit le fichier YAML du kernel (chemin via NETSMOG_KERNEL_CONFIG) et
 * construit le catalogue de cibles servi aux workers.
 *
 * FONCTIONNEMENT :
 * - Sections main / storage / workers / probes / targets
 * - Défauts appliqués à la construction du catalogue (intervalle, count)
 * - Validation : host non vide, intervalle et count >= 1
 */

use netsmog_contracts::{Catalogue, ProbeKind, Target, TargetGroup};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Intervalle par défaut quand ni la cible ni la sonde n'en fixent un.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_COUNT: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("target {group}.{target}: {reason}")]
    InvalidTarget {
        group: String,
        target: String,
        reason: String,
    },
    #[error("group {group}: {reason}")]
    InvalidGroup { group: String, reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct KernelConfig {
    #[serde(default)]
    pub main: MainConf,
    #[serde(default)]
    pub storage: StorageConf,
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerConf>,
    #[serde(default)]
    pub probes: HashMap<ProbeKind, ProbeConf>,
    #[serde(default)]
    pub targets: BTreeMap<String, GroupConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MainConf {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Fichier TOML `worker = "secret"`.
    #[serde(default = "default_secrets")]
    pub secrets: PathBuf,
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

fn default_secrets() -> PathBuf {
    PathBuf::from("secrets.toml")
}

impl Default for MainConf {
    fn default() -> Self {
        Self {
            title: String::new(),
            maintainer: String::new(),
            listen: default_listen(),
            secrets: default_secrets(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConf {
    #[default]
    Log,
    Influx(InfluxConf),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InfluxConf {
    pub host: String,
    #[serde(default = "default_influx_port")]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_influx_port() -> u16 {
    8086
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WorkerConf {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub display: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProbeConf {
    pub interval: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GroupConf {
    /// Workers allowed to run the group; empty = everyone.
    #[serde(default)]
    pub workers: Vec<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TargetConf {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_probe")]
    pub probe: ProbeKind,
    pub interval: Option<u64>,
    pub count: Option<u32>,
    pub host: String,
    #[serde(default)]
    pub workers: Vec<String>,
}

fn default_probe() -> ProbeKind {
    ProbeKind::Ping
}

impl KernelConfig {
    pub fn parse(txt: &str, path: &Path) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    fn interval_for(&self, target: &TargetConf) -> u64 {
        target
            .interval
            .or_else(|| self.probes.get(&target.probe).map(|p| p.interval))
            .unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    /// Construit le catalogue immuable servi aux workers (défauts appliqués, validé).
    pub fn catalogue(&self) -> Result<Catalogue, ConfigError> {
        let mut catalogue = Catalogue::default();

        for (group_name, group) in &self.targets {
            if group.workers.iter().any(|w| w.trim().is_empty()) {
                return Err(ConfigError::InvalidGroup {
                    group: group_name.clone(),
                    reason: "empty worker name in membership".into(),
                });
            }

            let mut targets = BTreeMap::new();
            for (target_name, conf) in &group.targets {
                let invalid = |reason: &str| ConfigError::InvalidTarget {
                    group: group_name.clone(),
                    target: target_name.clone(),
                    reason: reason.to_string(),
                };

                if conf.host.trim().is_empty() {
                    return Err(invalid("host is empty"));
                }
                let interval = self.interval_for(conf);
                if interval == 0 {
                    return Err(invalid("interval must be at least 1 second"));
                }
                let count = conf.count.unwrap_or(DEFAULT_COUNT);
                if count == 0 {
                    return Err(invalid("count must be at least 1"));
                }

                targets.insert(
                    target_name.clone(),
                    Target {
                        title: conf.title.clone(),
                        probe: conf.probe,
                        interval,
                        count,
                        host: conf.host.trim().to_string(),
                        workers: conf.workers.clone(),
                    },
                );
            }

            catalogue.insert(
                group_name.clone(),
                TargetGroup {
                    workers: group.workers.clone(),
                    targets,
                },
            );
        }

        Ok(catalogue)
    }
}

/// Chemin du fichier de config (`NETSMOG_KERNEL_CONFIG`, sinon `kernel.yaml`).
pub fn config_path() -> PathBuf {
    std::env::var("NETSMOG_KERNEL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("kernel.yaml"))
}

/// Lit et parse la config. Un fichier absent est une erreur (démarrage comme SIGHUP).
pub async fn load_config(path: &Path) -> Result<KernelConfig, ConfigError> {
    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    KernelConfig::parse(&txt, path)
}
