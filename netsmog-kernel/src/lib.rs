//! NetSmog kernel: distributes probe targets to the workers and stores
//! the measurements they send back.

pub mod config;
pub mod http;
pub mod reload;
pub mod secrets;
pub mod state;
pub mod storage;

pub use config::{load_config, ConfigError, KernelConfig};
pub use http::{build_router, AppState};
pub use secrets::SecretStore;
pub use state::{Registry, Snapshot};
