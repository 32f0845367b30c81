use std::time::Duration;

/// Why a single probe produced no latency.
///
/// None of these abort a cycle: the scheduler records a failure marker and
/// moves on to the next repetition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("cannot resolve {host}: {reason}")]
    Resolution { host: String, reason: String },
    #[error("ICMP transport error: {0}")]
    Transport(String),
    #[error("no echo reply within {0:?}")]
    Timeout(Duration),
}

/// Failure to hand a result batch to the kernel.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("kernel unreachable: {0}")]
    Transport(String),
    #[error("kernel refused submission: HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A document exchanged between agent and kernel could not be (de)serialised.
#[derive(Debug, thiserror::Error)]
#[error("malformed {what}: {source}")]
pub struct ProtocolError {
    pub what: &'static str,
    #[source]
    pub source: serde_json::Error,
}

impl ProtocolError {
    pub fn new(what: &'static str, source: serde_json::Error) -> Self {
        Self { what, source }
    }
}

/// Failure reported by a sample store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend unreachable: {0}")]
    Unreachable(String),
    #[error("storage backend rejected write to {series}: {reason}")]
    Rejected { series: String, reason: String },
}
