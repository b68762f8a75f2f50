//! Live-cluster client contracts.
//!
//! One `ClusterAdminClient`, `ConnectClient` and `SchemaRegistryClient`
//! instance per backing cluster, looked up by cluster name in a registry
//! built at startup. Implementations must tolerate concurrent access and
//! bound their waits: an exceeded wait surfaces as `ClientError::Timeout`,
//! which callers treat as retryable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ClientError;
use streamgov_core::{
    Compatibility, Connector, ConnectorStatus, ConnectClusterSpec, PartitionOutcome, SchemaSpec,
    Topic,
};

/// Administrative access to one backing cluster.
#[async_trait]
pub trait ClusterAdminClient: Send + Sync {
    /// Every topic name live on the cluster, internal topics included.
    async fn list_topic_names(&self) -> Result<Vec<String>, ClientError>;

    /// Full definitions for the given live topic names. Unknown names are
    /// absent from the result, not an error.
    async fn collect_topics(&self, names: &[String]) -> Result<HashMap<String, Topic>, ClientError>;

    async fn delete_topic(&self, name: &str) -> Result<(), ClientError>;

    /// Latest offset per partition: the targets below which records are
    /// deleted.
    async fn prepare_records_to_delete(
        &self,
        topic: &str,
    ) -> Result<BTreeMap<u32, i64>, ClientError>;

    /// Deletes records below the given offset per partition. Per-partition
    /// failures are reported in the result; only a failure of the call as a
    /// whole is an `Err`.
    async fn delete_records(
        &self,
        topic: &str,
        before_offsets: &BTreeMap<u32, i64>,
    ) -> Result<BTreeMap<u32, PartitionOutcome>, ClientError>;
}

/// A connector plugin installed on a connect cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub class: String,
    pub plugin_type: String,
    pub version: String,
}

/// Outcome of a worker-side connector configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValidationReport {
    pub error_count: u32,
    /// Per-field error messages, field order preserved.
    pub errors: Vec<String>,
}

/// REST access to the connect clusters reachable from one backing cluster,
/// addressed by connect-cluster name.
#[async_trait]
pub trait ConnectClient: Send + Sync {
    async fn list_plugins(&self, connect_cluster: &str) -> Result<Vec<PluginInfo>, ClientError>;

    /// Worker-side validation of a connector configuration against its
    /// plugin.
    async fn validate(
        &self,
        connect_cluster: &str,
        connector_class: &str,
        config: &[(String, String)],
    ) -> Result<ConfigValidationReport, ClientError>;

    /// Connectors currently deployed on the worker, with their declared
    /// configuration.
    async fn list_connectors(&self, connect_cluster: &str) -> Result<Vec<Connector>, ClientError>;

    async fn delete_connector(&self, connect_cluster: &str, name: &str)
    -> Result<(), ClientError>;

    async fn status(
        &self,
        connect_cluster: &str,
        name: &str,
    ) -> Result<ConnectorStatus, ClientError>;

    async fn restart_task(
        &self,
        connect_cluster: &str,
        name: &str,
        task_id: u32,
    ) -> Result<(), ClientError>;

    async fn pause(&self, connect_cluster: &str, name: &str) -> Result<(), ClientError>;

    async fn resume(&self, connect_cluster: &str, name: &str) -> Result<(), ClientError>;

    /// Reachability probe for a self-deployed cluster declaration, before
    /// the declaration is accepted into the store.
    async fn test_connection(&self, spec: &ConnectClusterSpec) -> Result<(), ClientError>;
}

/// A schema registered under a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredSchema {
    pub id: u32,
    pub version: u32,
    pub schema: String,
}

/// REST access to the schema registry of one backing cluster.
#[async_trait]
pub trait SchemaRegistryClient: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<String>, ClientError>;

    async fn get_latest(&self, subject: &str) -> Result<Option<RegisteredSchema>, ClientError>;

    async fn register(&self, subject: &str, spec: &SchemaSpec) -> Result<u32, ClientError>;

    /// Soft delete by default; `permanent` drops the subject for good.
    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, ClientError>;

    async fn get_compatibility(&self, subject: &str) -> Result<Compatibility, ClientError>;

    async fn set_compatibility(
        &self,
        subject: &str,
        compatibility: Compatibility,
    ) -> Result<(), ClientError>;

    /// Incompatibility messages, empty when the proposed schema is
    /// compatible with the latest registered version.
    async fn check_compatibility(
        &self,
        subject: &str,
        spec: &SchemaSpec,
    ) -> Result<Vec<String>, ClientError>;
}
