use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use streamgov_core::{AccessControlEntry, ConnectCluster, Connector, Namespace, Topic};
use streamgov_storage::{
    AccessControlRepository, ConnectClusterRepository, ConnectorRepository, NamespaceRepository,
    StorageError, TopicRepository,
};

fn scoped_key(scope: &str, name: &str) -> String {
    format!("{scope}/{name}")
}

/// In-memory backend implementing every declared-state repository.
///
/// Cluster-scoped resources are keyed `cluster/name`; access control
/// entries by their identity `grantor/name`; namespaces by their globally
/// unique name.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    namespaces: Arc<DashMap<String, Namespace>>,
    entries: Arc<DashMap<String, AccessControlEntry>>,
    topics: Arc<DashMap<String, Topic>>,
    connectors: Arc<DashMap<String, Connector>>,
    connect_clusters: Arc<DashMap<String, ConnectCluster>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_matching<T: Clone>(
        map: &DashMap<String, T>,
        matches: impl Fn(&T) -> bool,
    ) -> Vec<T> {
        map.iter()
            .filter(|entry| matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl NamespaceRepository for InMemoryStore {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Namespace>, StorageError> {
        let mut found = Self::collect_matching(&self.namespaces, |ns: &Namespace| {
            ns.metadata.cluster == cluster
        });
        found.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(found)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>, StorageError> {
        Ok(self.namespaces.get(name).map(|ns| ns.clone()))
    }

    async fn create(&self, namespace: Namespace) -> Result<Namespace, StorageError> {
        self.namespaces
            .insert(namespace.metadata.name.clone(), namespace.clone());
        Ok(namespace)
    }

    async fn delete(&self, namespace: &Namespace) -> Result<(), StorageError> {
        self.namespaces
            .remove(&namespace.metadata.name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(Namespace::KIND, &namespace.metadata.name))
    }
}

#[async_trait]
impl AccessControlRepository for InMemoryStore {
    async fn find_all_for_cluster(
        &self,
        cluster: &str,
    ) -> Result<Vec<AccessControlEntry>, StorageError> {
        let mut found = Self::collect_matching(&self.entries, |ace: &AccessControlEntry| {
            ace.metadata.cluster == cluster
        });
        found.sort_by(|a, b| {
            (a.grantor(), &a.metadata.name).cmp(&(b.grantor(), &b.metadata.name))
        });
        Ok(found)
    }

    async fn find_by_name(
        &self,
        grantor: &str,
        name: &str,
    ) -> Result<Option<AccessControlEntry>, StorageError> {
        Ok(self
            .entries
            .get(&scoped_key(grantor, name))
            .map(|ace| ace.clone()))
    }

    async fn create(&self, entry: AccessControlEntry) -> Result<AccessControlEntry, StorageError> {
        let key = scoped_key(entry.grantor(), &entry.metadata.name);
        // Entries are never mutated in place: re-creating the same identity
        // is only accepted when the grant is identical.
        if let Some(existing) = self.entries.get(&key) {
            if existing.spec != entry.spec {
                return Err(StorageError::already_exists(
                    AccessControlEntry::KIND,
                    &entry.metadata.name,
                ));
            }
        }
        self.entries.insert(key, entry.clone());
        Ok(entry)
    }

    async fn delete(&self, entry: &AccessControlEntry) -> Result<(), StorageError> {
        self.entries
            .remove(&scoped_key(entry.grantor(), &entry.metadata.name))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(AccessControlEntry::KIND, &entry.metadata.name))
    }
}

#[async_trait]
impl TopicRepository for InMemoryStore {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Topic>, StorageError> {
        let mut found = Self::collect_matching(&self.topics, |topic: &Topic| {
            topic.metadata.cluster == cluster
        });
        found.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(found)
    }

    async fn find_by_name(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<Topic>, StorageError> {
        Ok(self
            .topics
            .get(&scoped_key(cluster, name))
            .map(|topic| topic.clone()))
    }

    async fn create(&self, topic: Topic) -> Result<Topic, StorageError> {
        let key = scoped_key(&topic.metadata.cluster, &topic.metadata.name);
        self.topics.insert(key, topic.clone());
        Ok(topic)
    }

    async fn delete(&self, topic: &Topic) -> Result<(), StorageError> {
        self.topics
            .remove(&scoped_key(&topic.metadata.cluster, &topic.metadata.name))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(Topic::KIND, &topic.metadata.name))
    }
}

#[async_trait]
impl ConnectorRepository for InMemoryStore {
    async fn find_all_for_cluster(&self, cluster: &str) -> Result<Vec<Connector>, StorageError> {
        let mut found = Self::collect_matching(&self.connectors, |connector: &Connector| {
            connector.metadata.cluster == cluster
        });
        found.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(found)
    }

    async fn find_by_name(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<Connector>, StorageError> {
        Ok(self
            .connectors
            .get(&scoped_key(cluster, name))
            .map(|connector| connector.clone()))
    }

    async fn create(&self, connector: Connector) -> Result<Connector, StorageError> {
        let key = scoped_key(&connector.metadata.cluster, &connector.metadata.name);
        self.connectors.insert(key, connector.clone());
        Ok(connector)
    }

    async fn delete(&self, connector: &Connector) -> Result<(), StorageError> {
        self.connectors
            .remove(&scoped_key(&connector.metadata.cluster, &connector.metadata.name))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(Connector::KIND, &connector.metadata.name))
    }
}

#[async_trait]
impl ConnectClusterRepository for InMemoryStore {
    async fn find_all_for_cluster(
        &self,
        cluster: &str,
    ) -> Result<Vec<ConnectCluster>, StorageError> {
        let mut found = Self::collect_matching(&self.connect_clusters, |cc: &ConnectCluster| {
            cc.metadata.cluster == cluster
        });
        found.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(found)
    }

    async fn find_by_name(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<ConnectCluster>, StorageError> {
        Ok(self
            .connect_clusters
            .get(&scoped_key(cluster, name))
            .map(|cc| cc.clone()))
    }

    async fn create(
        &self,
        connect_cluster: ConnectCluster,
    ) -> Result<ConnectCluster, StorageError> {
        let key = scoped_key(
            &connect_cluster.metadata.cluster,
            &connect_cluster.metadata.name,
        );
        self.connect_clusters.insert(key, connect_cluster.clone());
        Ok(connect_cluster)
    }

    async fn delete(&self, connect_cluster: &ConnectCluster) -> Result<(), StorageError> {
        self.connect_clusters
            .remove(&scoped_key(
                &connect_cluster.metadata.cluster,
                &connect_cluster.metadata.name,
            ))
            .map(|_| ())
            .ok_or_else(|| {
                StorageError::not_found(ConnectCluster::KIND, &connect_cluster.metadata.name)
            })
    }
}
