//! Collaborator ports
//!
//! Interfaces at the seams of the system, so the scheduler, the HTTP layer
//! and the tests can swap the real ICMP socket, kernel client or
//! time-series database for in-process doubles.

use crate::error::{ProbeError, StorageError, SubmitError};
use crate::models::{ProbeResult, ResultBatch};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Columns of every series written by the kernel.
pub const SAMPLE_COLUMNS: [&str; 2] = ["worker", "value"];

/// Something able to measure the round-trip time to a host.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Fires one echo request at `host` and waits at most `deadline` for the reply.
    async fn probe(&self, host: &str, deadline: Duration) -> Result<Duration, ProbeError>;
}

/// Destination of the batches produced by the scheduler.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn submit(&self, batch: &ResultBatch) -> Result<(), SubmitError>;
}

/// One write against the time-series store: a named series, fixed columns
/// and one `[worker, value]` point per sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    pub name: String,
    pub columns: Vec<String>,
    pub points: Vec<(String, f64)>,
    /// When the kernel accepted the samples. Shared by every point of the set.
    #[serde(skip)]
    pub received_at: OffsetDateTime,
}

impl SampleSet {
    /// Series `group.target` holding every sample of `result`, labelled with `worker`.
    pub fn from_result(group: &str, target: &str, worker: &str, result: &ProbeResult) -> Self {
        Self {
            name: format!("{group}.{target}"),
            columns: SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            points: result
                .samples()
                .iter()
                .map(|sample| (worker.to_string(), sample.as_millis_f64()))
                .collect(),
            received_at: OffsetDateTime::now_utc(),
        }
    }

    /// `received_at` as RFC 3339, for logs.
    pub fn received_label(&self) -> String {
        self.received_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.received_at.to_string())
    }
}

/// Time-series storage backend used by the kernel.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn write(&self, set: SampleSet) -> Result<(), StorageError>;

    /// Connectivity check run once at kernel start.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
