//! Contracts between the StreamGov core and its external collaborators:
//! the declared-state store and the live-cluster clients.

pub mod clients;
pub mod error;
pub mod repositories;

pub use clients::{
    ClusterAdminClient, ConnectClient, ConfigValidationReport, PluginInfo, RegisteredSchema,
    SchemaRegistryClient,
};
pub use error::{ClientError, StorageError};
pub use repositories::{
    AccessControlRepository, ConnectClusterRepository, ConnectorRepository, NamespaceRepository,
    TopicRepository,
};
