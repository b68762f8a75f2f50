//! Validation pipeline, reconciliation engine and secret vault.
//!
//! Every mutating operation runs through the same shape: resolve ownership
//! through the access engine, aggregate local structural errors, fold in
//! remote validation results, then persist (or simulate, under dry-run)
//! with a computed apply outcome. Reconciliation runs independently, one
//! unit per backing cluster.

pub mod config;
pub mod connect_cluster;
pub mod connector;
pub mod namespace;
pub mod reconcile;
pub mod schema;
pub mod topic;
pub mod vault;

pub use config::{ClusterConfig, ClusterProvider, ConnectWorkerConfig, GovConfig};
pub use connect_cluster::ConnectClusterService;
pub use connector::ConnectorService;
pub use namespace::NamespaceService;
pub use reconcile::{ConnectorReconciler, ReconcilerRegistry, TopicReconciler};
pub use schema::SchemaService;
pub use topic::TopicService;
pub use vault::VaultResponse;
