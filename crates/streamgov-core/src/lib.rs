//! Core resource and ownership model shared by every StreamGov component.

pub mod access;
pub mod apply;
pub mod connect_cluster;
pub mod connector;
pub mod delete_records;
pub mod error;
pub mod metadata;
pub mod namespace;
pub mod schema;
pub mod topic;

pub use access::{AccessControlEntry, AceSpec, PatternType, Permission, ResourceType};
pub use apply::ApplyOutcome;
pub use connect_cluster::{ConnectCluster, ConnectClusterSpec};
pub use connector::{CONNECTOR_CLASS_CONFIG, Connector, ConnectorSpec, ConnectorStatus, TaskState};
pub use delete_records::{DeleteRecordsOutcome, PartitionOutcome};
pub use error::{GovernanceError, Result};
pub use metadata::Metadata;
pub use namespace::{ConnectorValidator, Namespace, NamespaceSpec, TopicValidator, ADMIN_NAMESPACE};
pub use schema::{Compatibility, Schema, SchemaSpec, SchemaType};
pub use topic::{Topic, TopicSpec, TopicStatus, CLEANUP_POLICY_COMPACT, CLEANUP_POLICY_CONFIG, CLEANUP_POLICY_DELETE};
