//! NetSmog agent: fetches its targets from the kernel, probes them on
//! their own schedule and reports the latencies back.

pub mod client;
pub mod config;
pub mod probe;
pub mod scheduler;
pub mod shutdown;

pub use client::{CoordinatorClient, FetchError};
pub use config::AgentConfig;
pub use probe::EchoProber;
pub use scheduler::Scheduler;
