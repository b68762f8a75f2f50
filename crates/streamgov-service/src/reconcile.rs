//! Per-cluster reconciliation between declared and live state.
//!
//! One reconciler per backing cluster, built at startup and looked up in an
//! explicit registry. Reconcilers read live state and propagate deletions;
//! they never mutate the declared store on their own initiative.

use futures_util::future;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use streamgov_access::AccessControlService;
use streamgov_core::{
    Connector, GovernanceError, Namespace, PartitionOutcome, ResourceType, Result, Topic,
};
use streamgov_storage::{ClusterAdminClient, ConnectClient, ConnectorRepository, TopicRepository};

/// Reconciles the topics of one backing cluster.
pub struct TopicReconciler {
    cluster: String,
    admin: Arc<dyn ClusterAdminClient>,
    topics: Arc<dyn TopicRepository>,
    access: Arc<AccessControlService>,
}

impl TopicReconciler {
    pub fn new(
        cluster: impl Into<String>,
        admin: Arc<dyn ClusterAdminClient>,
        topics: Arc<dyn TopicRepository>,
        access: Arc<AccessControlService>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            admin,
            topics,
            access,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn admin(&self) -> &Arc<dyn ClusterAdminClient> {
        &self.admin
    }

    /// Live topic names owned by the namespace but not declared: drift
    /// candidates for import.
    pub async fn list_unsynchronized_names(&self, ns: &Namespace) -> Result<Vec<String>> {
        let live = self.admin.list_topic_names().await?;
        let grants = self.access.grants_received_by(ns).await?;
        let declared: HashSet<String> = self
            .topics
            .find_all_for_cluster(&self.cluster)
            .await?
            .into_iter()
            .map(|t| t.metadata.name)
            .collect();

        Ok(live
            .into_iter()
            .filter(|name| {
                grants
                    .iter()
                    .any(|ace| ace.establishes_ownership(ns.name(), ResourceType::Topic, name))
            })
            .filter(|name| !declared.contains(name))
            .collect())
    }

    /// Full definitions of the unsynchronized topics, collected from the
    /// live cluster.
    pub async fn list_unsynchronized(&self, ns: &Namespace) -> Result<Vec<Topic>> {
        let names = self.list_unsynchronized_names(ns).await?;
        let mut collected = self.admin.collect_topics(&names).await?;

        // Preserve live listing order; names vanished between the two calls
        // are simply dropped.
        Ok(names
            .iter()
            .filter_map(|name| collected.remove(name))
            .collect())
    }

    /// Live topic names colliding with the given name once `.` and `_` are
    /// normalized. The identical name is not a collision.
    pub async fn find_collisions(&self, name: &str) -> Result<Vec<String>> {
        let live = self.admin.list_topic_names().await?;
        Ok(live
            .into_iter()
            .filter(|other| other != name && Topic::collides_with(name, other))
            .collect())
    }

    /// Propagates a topic deletion: live cluster first, declared record
    /// second. A live failure keeps the record and surfaces the error, so a
    /// retry sees consistent state.
    pub async fn delete(&self, topic: &Topic) -> Result<()> {
        self.admin.delete_topic(topic.name()).await?;
        self.topics.delete(topic).await?;
        info!(cluster = %self.cluster, topic = topic.name(), "deleted topic");
        Ok(())
    }

    /// Latest offset per partition, the bound below which records would be
    /// deleted. Read-only.
    pub async fn prepare_records_to_delete(&self, topic: &str) -> Result<BTreeMap<u32, i64>> {
        Ok(self.admin.prepare_records_to_delete(topic).await?)
    }

    /// Issues the bounded record deletion. Per-partition failures stay in
    /// the result; only a failure of the call as a whole is an error.
    pub async fn delete_records(
        &self,
        topic: &str,
        before_offsets: &BTreeMap<u32, i64>,
    ) -> Result<BTreeMap<u32, PartitionOutcome>> {
        let outcomes = self.admin.delete_records(topic, before_offsets).await?;
        for (partition, outcome) in &outcomes {
            if let PartitionOutcome::Failed { error } = outcome {
                warn!(cluster = %self.cluster, topic, partition, %error, "record deletion failed");
            }
        }
        Ok(outcomes)
    }
}

/// Reconciles the connectors reachable from one backing cluster.
pub struct ConnectorReconciler {
    cluster: String,
    connect: Arc<dyn ConnectClient>,
    connectors: Arc<dyn ConnectorRepository>,
    access: Arc<AccessControlService>,
}

impl ConnectorReconciler {
    pub fn new(
        cluster: impl Into<String>,
        connect: Arc<dyn ConnectClient>,
        connectors: Arc<dyn ConnectorRepository>,
        access: Arc<AccessControlService>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            connect,
            connectors,
            access,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn connect(&self) -> &Arc<dyn ConnectClient> {
        &self.connect
    }

    /// Deployed connectors owned by the namespace but not declared,
    /// gathered concurrently across the given connect clusters. Output
    /// follows the input connect-cluster order.
    pub async fn list_unsynchronized(
        &self,
        ns: &Namespace,
        connect_clusters: &[String],
    ) -> Result<Vec<Connector>> {
        let grants = self.access.grants_received_by(ns).await?;
        let declared: HashSet<String> = self
            .connectors
            .find_all_for_cluster(&self.cluster)
            .await?
            .into_iter()
            .map(|c| c.metadata.name)
            .collect();

        let listings = future::try_join_all(
            connect_clusters
                .iter()
                .map(|cc| self.connect.list_connectors(cc)),
        )
        .await?;

        Ok(listings
            .into_iter()
            .flatten()
            .filter(|connector| {
                grants.iter().any(|ace| {
                    ace.establishes_ownership(ns.name(), ResourceType::Connect, connector.name())
                })
            })
            .filter(|connector| !declared.contains(connector.name()))
            .collect())
    }

    /// Propagates a connector deletion: worker first, declared record
    /// second.
    pub async fn delete(&self, connector: &Connector) -> Result<()> {
        self.connect
            .delete_connector(&connector.spec.connect_cluster, connector.name())
            .await?;
        self.connectors.delete(connector).await?;
        info!(
            cluster = %self.cluster,
            connect_cluster = %connector.spec.connect_cluster,
            connector = connector.name(),
            "deleted connector"
        );
        Ok(())
    }
}

/// All reconcilers of the deployment, keyed by backing cluster name. Built
/// once at startup from the static configuration and injected into the
/// services.
#[derive(Default)]
pub struct ReconcilerRegistry {
    topics: HashMap<String, Arc<TopicReconciler>>,
    connectors: HashMap<String, Arc<ConnectorReconciler>>,
}

impl ReconcilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_topic(&mut self, reconciler: Arc<TopicReconciler>) {
        self.topics
            .insert(reconciler.cluster().to_string(), reconciler);
    }

    pub fn register_connector(&mut self, reconciler: Arc<ConnectorReconciler>) {
        self.connectors
            .insert(reconciler.cluster().to_string(), reconciler);
    }

    pub fn topic(&self, cluster: &str) -> Result<&Arc<TopicReconciler>> {
        self.topics.get(cluster).ok_or_else(|| {
            GovernanceError::upstream(format!("No reconciler configured for cluster {cluster}"))
        })
    }

    pub fn connector(&self, cluster: &str) -> Result<&Arc<ConnectorReconciler>> {
        self.connectors.get(cluster).ok_or_else(|| {
            GovernanceError::upstream(format!("No reconciler configured for cluster {cluster}"))
        })
    }

    pub fn clusters(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use streamgov_core::{AceSpec, Metadata, NamespaceSpec, PatternType, Permission, TopicSpec};
    use streamgov_db_memory::InMemoryStore;
    use streamgov_storage::{
        AccessControlRepository, ClientError, NamespaceRepository,
    };

    struct FakeAdmin {
        live: Vec<String>,
        deleted: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    impl FakeAdmin {
        fn with_live(names: &[&str]) -> Self {
            Self {
                live: names.iter().map(|n| n.to_string()).collect(),
                deleted: Mutex::new(Vec::new()),
                fail_delete: false,
            }
        }
    }

    #[async_trait]
    impl ClusterAdminClient for FakeAdmin {
        async fn list_topic_names(&self) -> std::result::Result<Vec<String>, ClientError> {
            Ok(self.live.clone())
        }

        async fn collect_topics(
            &self,
            names: &[String],
        ) -> std::result::Result<HashMap<String, Topic>, ClientError> {
            Ok(names
                .iter()
                .filter(|name| self.live.contains(name))
                .map(|name| {
                    let topic = Topic::new(
                        Metadata::new(name.clone()).with_cluster("local"),
                        TopicSpec {
                            partitions: 3,
                            replication_factor: 3,
                            configs: Default::default(),
                        },
                    );
                    (name.clone(), topic)
                })
                .collect())
        }

        async fn delete_topic(&self, name: &str) -> std::result::Result<(), ClientError> {
            if self.fail_delete {
                return Err(ClientError::timeout(30_000));
            }
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn prepare_records_to_delete(
            &self,
            _topic: &str,
        ) -> std::result::Result<BTreeMap<u32, i64>, ClientError> {
            Ok(BTreeMap::from([(0, 100), (1, 50)]))
        }

        async fn delete_records(
            &self,
            _topic: &str,
            before_offsets: &BTreeMap<u32, i64>,
        ) -> std::result::Result<BTreeMap<u32, PartitionOutcome>, ClientError> {
            Ok(before_offsets
                .iter()
                .map(|(p, offset)| (*p, PartitionOutcome::Deleted { low_water_mark: *offset }))
                .collect())
        }
    }

    fn namespace(name: &str) -> Namespace {
        Namespace::new(
            Metadata::new(name).with_cluster("local"),
            NamespaceSpec {
                principal: format!("user-{name}"),
                connect_clusters: vec![],
                topic_validator: None,
                connector_validator: None,
            },
        )
    }

    fn owner_grant(ns: &str, prefix: &str) -> streamgov_core::AccessControlEntry {
        streamgov_core::AccessControlEntry::new(
            Metadata::new(format!("acl-{ns}"))
                .with_namespace(ns)
                .with_cluster("local"),
            AceSpec {
                resource_type: ResourceType::Topic,
                resource: prefix.to_string(),
                pattern_type: PatternType::Prefixed,
                permission: Permission::Owner,
                granted_to: ns.to_string(),
            },
        )
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let ns_repo: &dyn NamespaceRepository = store.as_ref();
        ns_repo.create(namespace("finance")).await.unwrap();
        let ace_repo: &dyn AccessControlRepository = store.as_ref();
        ace_repo.create(owner_grant("finance", "fin.")).await.unwrap();
        store
    }

    fn reconciler(store: Arc<InMemoryStore>, admin: Arc<FakeAdmin>) -> TopicReconciler {
        let access = Arc::new(AccessControlService::new(store.clone(), store.clone()));
        TopicReconciler::new("local", admin, store, access)
    }

    #[tokio::test]
    async fn test_unsynchronized_is_live_owned_minus_declared() {
        let store = seeded_store().await;
        let topic_repo: &dyn TopicRepository = store.as_ref();
        topic_repo
            .create(Topic::new(
                Metadata::new("fin.declared").with_cluster("local"),
                TopicSpec {
                    partitions: 1,
                    replication_factor: 1,
                    configs: Default::default(),
                },
            ))
            .await
            .unwrap();

        let admin = Arc::new(FakeAdmin::with_live(&[
            "fin.declared",
            "fin.orphan",
            "mkt.other",
            "_internal",
        ]));
        let reconciler = reconciler(store, admin);

        let names = reconciler
            .list_unsynchronized_names(&namespace("finance"))
            .await
            .unwrap();
        assert_eq!(names, vec!["fin.orphan"]);

        let topics = reconciler
            .list_unsynchronized(&namespace("finance"))
            .await
            .unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name(), "fin.orphan");
    }

    #[tokio::test]
    async fn test_collisions_exclude_identical_name() {
        let store = seeded_store().await;
        let admin = Arc::new(FakeAdmin::with_live(&["fin.orders", "fin_orders", "fin.other"]));
        let reconciler = reconciler(store, admin);

        let collisions = reconciler.find_collisions("fin.orders").await.unwrap();
        assert_eq!(collisions, vec!["fin_orders"]);

        let none = reconciler.find_collisions("fin.other").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_propagates_live_then_repo() {
        let store = seeded_store().await;
        let topic = Topic::new(
            Metadata::new("fin.orders").with_cluster("local"),
            TopicSpec {
                partitions: 1,
                replication_factor: 1,
                configs: Default::default(),
            },
        );
        let topic_repo: &dyn TopicRepository = store.as_ref();
        topic_repo.create(topic.clone()).await.unwrap();

        let admin = Arc::new(FakeAdmin::with_live(&["fin.orders"]));
        let reconciler = reconciler(store.clone(), admin.clone());

        reconciler.delete(&topic).await.unwrap();
        assert_eq!(*admin.deleted.lock().unwrap(), vec!["fin.orders"]);
        let topic_repo: &dyn TopicRepository = store.as_ref();
        assert!(topic_repo.find_by_name("local", "fin.orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_delete_failure_keeps_declared_record() {
        let store = seeded_store().await;
        let topic = Topic::new(
            Metadata::new("fin.orders").with_cluster("local"),
            TopicSpec {
                partitions: 1,
                replication_factor: 1,
                configs: Default::default(),
            },
        );
        let topic_repo: &dyn TopicRepository = store.as_ref();
        topic_repo.create(topic.clone()).await.unwrap();

        let mut admin = FakeAdmin::with_live(&["fin.orders"]);
        admin.fail_delete = true;
        let reconciler = reconciler(store.clone(), Arc::new(admin));

        let err = reconciler.delete(&topic).await.unwrap_err();
        assert!(err.is_retryable());
        let topic_repo: &dyn TopicRepository = store.as_ref();
        assert!(topic_repo.find_by_name("local", "fin.orders").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_registry_lookup_unknown_cluster() {
        let registry = ReconcilerRegistry::new();
        assert!(registry.topic("ghost").is_err());
        assert!(registry.connector("ghost").is_err());
    }
}
