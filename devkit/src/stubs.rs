/*!
Doublures des collaborateurs NetSmog pour tests sans réseau

- `MemoryStore` : backend de stockage en mémoire (remplace InfluxDB)
- `RecordingSink` : enregistre les lots que l'agent soumettrait au kernel
- `ScriptedProber` : rejoue une suite de mesures au lieu d'émettre de l'ICMP
*/

use async_trait::async_trait;
use netsmog_contracts::{
    ProbeError, Prober, ResultBatch, ResultSink, SampleSet, SampleStore, StorageError, SubmitError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Une ligne écrite dans le store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub series: String,
    pub worker: String,
    pub value: f64,
    pub received_at: OffsetDateTime,
}

/// Backend de stockage en mémoire.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredRow>>,
    writes: AtomicUsize,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store dont toutes les écritures échouent (backend injoignable).
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows.lock().clone()
    }

    /// Nombre d'appels à `write`, réussis ou non.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, set: SampleSet) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(StorageError::Unreachable("memory store is failing".into()));
        }
        let mut rows = self.rows.lock();
        for (worker, value) in set.points {
            rows.push(StoredRow {
                series: set.name.clone(),
                worker,
                value,
                received_at: set.received_at,
            });
        }
        Ok(())
    }
}

/// Sink qui garde les lots soumis.
#[derive(Clone, Default)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<ResultBatch>>>,
    refuse_with: Option<u16>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink qui enregistre puis répond comme un kernel renvoyant `status`.
    pub fn refusing(status: u16) -> Self {
        Self { refuse_with: Some(status), ..Self::default() }
    }

    pub fn batches(&self) -> Vec<ResultBatch> {
        self.batches.lock().clone()
    }

    /// Attend qu'au moins `count` lots aient été soumis, ou l'expiration du délai.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ResultBatch> {
        let start = tokio::time::Instant::now();
        while start.elapsed() < timeout {
            if self.batches.lock().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.batches()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn submit(&self, batch: &ResultBatch) -> Result<(), SubmitError> {
        self.batches.lock().push(batch.clone());
        match self.refuse_with {
            Some(status) => Err(SubmitError::Status(status)),
            None => Ok(()),
        }
    }
}

/// Appel reçu par le prober.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCall {
    pub host: String,
    pub deadline: Duration,
}

/// Prober qui rejoue un script de résultats en boucle.
pub struct ScriptedProber {
    script: Vec<Result<Duration, ProbeError>>,
    delay: Duration,
    calls: Mutex<Vec<ProbeCall>>,
}

impl ScriptedProber {
    pub fn new(script: Vec<Result<Duration, ProbeError>>) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Chaque sonde répond toujours `rtt`.
    pub fn constant(rtt: Duration) -> Self {
        Self::new(vec![Ok(rtt)])
    }

    /// Chaque appel dure `delay` avant de rendre son résultat.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, host: &str, deadline: Duration) -> Result<Duration, ProbeError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(ProbeCall { host: host.to_string(), deadline });
            calls.len() - 1
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.script.is_empty() {
            return Err(ProbeError::Timeout(deadline));
        }
        self.script[index % self.script.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsmog_contracts::{ProbeResult, ProbeSample};

    #[tokio::test]
    async fn test_memory_store_rows() {
        let store = MemoryStore::new();
        let result = ProbeResult::from(vec![ProbeSample::Failed, ProbeSample::Failed]);
        let set = SampleSet::from_result("g", "t", "w", &result);
        let stamp = set.received_at;
        store.write(set).await.unwrap();
        assert_eq!(store.writes(), 1);
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].series, "g.t");
        assert!(rows.iter().all(|r| r.received_at == stamp));
    }

    #[tokio::test]
    async fn test_scripted_prober_cycles() {
        let prober = ScriptedProber::new(vec![
            Ok(Duration::from_millis(1)),
            Err(ProbeError::Transport("boom".into())),
        ]);
        let d = Duration::from_millis(100);
        assert!(prober.probe("a", d).await.is_ok());
        assert!(prober.probe("a", d).await.is_err());
        assert!(prober.probe("a", d).await.is_ok());
        assert_eq!(prober.call_count(), 3);
        assert_eq!(prober.calls()[0], ProbeCall { host: "a".into(), deadline: d });
    }

    #[tokio::test]
    async fn test_refusing_sink_still_records() {
        let sink = RecordingSink::refusing(403);
        let err = sink.submit(&ResultBatch::new()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Status(403)));
        assert_eq!(sink.batches().len(), 1);
    }
}
