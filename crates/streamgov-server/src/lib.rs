//! Control-plane host: configuration loading, tracing setup, service
//! wiring and the periodic reconciliation loop. Everything here is thin
//! glue; the behavior lives in the service crates.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod reconcile_loop;

pub use bootstrap::{ClusterClients, ControlPlane};
pub use config::{ConfigError, ServerConfig, load_config};
