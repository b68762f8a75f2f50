//! Declared-state repository contracts.
//!
//! One repository per declared resource kind. Implementations must be
//! thread-safe (`Send + Sync`) and must make a `create` immediately visible
//! to a subsequent `find_by_name` in the same process. Mutations are atomic
//! for the single record they target only; there is no cross-resource
//! transaction.

use async_trait::async_trait;

use crate::error::StorageError;
use streamgov_core::{AccessControlEntry, ConnectCluster, Connector, Namespace, Topic};

#[async_trait]
pub trait NamespaceRepository: Send + Sync {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Namespace>, StorageError>;

    /// Namespace names are globally unique across clusters.
    async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>, StorageError>;

    async fn create(&self, namespace: Namespace) -> Result<Namespace, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the namespace does not exist.
    async fn delete(&self, namespace: &Namespace) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AccessControlRepository: Send + Sync {
    async fn find_all_for_cluster(
        &self,
        cluster: &str,
    ) -> Result<Vec<AccessControlEntry>, StorageError>;

    /// Lookup by entry identity: (grantor namespace, entry name).
    async fn find_by_name(
        &self,
        grantor: &str,
        name: &str,
    ) -> Result<Option<AccessControlEntry>, StorageError>;

    async fn create(&self, entry: AccessControlEntry) -> Result<AccessControlEntry, StorageError>;

    async fn delete(&self, entry: &AccessControlEntry) -> Result<(), StorageError>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Topic>, StorageError>;

    async fn find_by_name(&self, cluster: &str, name: &str)
    -> Result<Option<Topic>, StorageError>;

    /// Creates or replaces the declared record.
    async fn create(&self, topic: Topic) -> Result<Topic, StorageError>;

    async fn delete(&self, topic: &Topic) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ConnectorRepository: Send + Sync {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Connector>, StorageError>;

    async fn find_by_name(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<Connector>, StorageError>;

    async fn create(&self, connector: Connector) -> Result<Connector, StorageError>;

    async fn delete(&self, connector: &Connector) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ConnectClusterRepository: Send + Sync {
    async fn find_all_for_cluster(
        &self,
        cluster: &str,
    ) -> Result<Vec<ConnectCluster>, StorageError>;

    async fn find_by_name(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<ConnectCluster>, StorageError>;

    async fn create(&self, connect_cluster: ConnectCluster)
    -> Result<ConnectCluster, StorageError>;

    async fn delete(&self, connect_cluster: &ConnectCluster) -> Result<(), StorageError>;
}
