/**
 * STOCKAGE DES ÉCHANTILLONS - Backends de séries temporelles du kernel
 *
 * RÔLE : Reçoit un SampleSet par (groupe, cible) soumis et l'écrit.
 *
 * BACKENDS :
 * - log : trace chaque ligne (défaut, aucune dépendance externe)
 * - influx : écriture HTTP style InfluxDB 0.8 (POST /db/{db}/series)
 */

use crate::config::{InfluxConf, StorageConf};
use async_trait::async_trait;
use netsmog_contracts::{SampleSet, SampleStore, StorageError};
use std::sync::Arc;
use std::time::Duration;

const INFLUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend par défaut : chaque ligne devient un événement `tracing`.
#[derive(Debug, Default)]
pub struct LogStore;

#[async_trait]
impl SampleStore for LogStore {
    fn name(&self) -> &str {
        "log"
    }

    async fn write(&self, set: SampleSet) -> Result<(), StorageError> {
        let received = set.received_label();
        for (worker, value) in &set.points {
            tracing::info!(series = %set.name, worker = %worker, value, received = %received, "sample");
        }
        Ok(())
    }
}

pub struct InfluxStore {
    base_url: String,
    database: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl InfluxStore {
    pub fn new(conf: &InfluxConf) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(INFLUX_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;
        let host = conf.host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", conf.port)
        } else {
            format!("http://{host}:{}", conf.port)
        };
        Ok(Self {
            base_url,
            database: conf.database.clone(),
            username: conf.username.clone(),
            password: conf.password.clone(),
            http,
        })
    }

    fn credentials(&self) -> [(&'static str, &str); 2] {
        [("u", self.username.as_str()), ("p", self.password.as_str())]
    }
}

#[async_trait]
impl SampleStore for InfluxStore {
    fn name(&self) -> &str {
        "influx"
    }

    async fn write(&self, set: SampleSet) -> Result<(), StorageError> {
        let url = format!("{}/db/{}/series", self.base_url, self.database);
        let response = self
            .http
            .post(&url)
            .query(&self.credentials())
            .json(&[&set])
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            series: set.name,
            reason: format!("HTTP {status} {body}"),
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::Unreachable(format!("ping answered HTTP {}", response.status())))
        }
    }
}

pub fn build_store(conf: &StorageConf) -> Result<Arc<dyn SampleStore>, StorageError> {
    match conf {
        StorageConf::Log => Ok(Arc::new(LogStore)),
        StorageConf::Influx(influx) => Ok(Arc::new(InfluxStore::new(influx)?)),
    }
}
