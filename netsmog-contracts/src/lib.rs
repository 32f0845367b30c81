//! NetSmog contracts - everything the kernel and its agents must agree on
//!
//! - Target catalogue and result batch shapes (JSON wire format)
//! - Worker authorisation tokens (issue / verify)
//! - Per-worker target resolution
//! - Collaborator ports (prober, result sink, sample store)

pub mod auth;
pub mod error;
pub mod models;
pub mod ports;
pub mod resolver;

pub use auth::{issue, issue_with_cost, verify, AuthError, AuthFailure, AuthToken, IssueError};
pub use error::{ProbeError, ProtocolError, StorageError, SubmitError};
pub use models::{
    Assignment, Catalogue, ProbeKind, ProbeResult, ProbeSample, ResultBatch, Target, TargetGroup,
};
pub use ports::{Prober, ResultSink, SampleSet, SampleStore};
pub use resolver::resolve;

/// HTTP header carrying the worker identity.
pub const WORKER_HEADER: &str = "Worker";

/// HTTP header carrying the authorisation token (British spelling is part of the protocol).
pub const AUTHORISATION_HEADER: &str = "Authorisation";

/// Kernel endpoint serving assignments (GET) and receiving results (POST).
pub const WORKER_PATH: &str = "/worker";
