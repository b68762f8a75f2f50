//! Assembles the control plane: store, access engine, per-cluster
//! reconcilers and services, all built once from the configuration and the
//! injected live-cluster clients.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use streamgov_access::AccessControlService;
use streamgov_db_memory::InMemoryStore;
use streamgov_service::{
    ConnectClusterService, ConnectorReconciler, ConnectorService, GovConfig, NamespaceService,
    ReconcilerRegistry, SchemaService, TopicReconciler, TopicService,
};
use streamgov_storage::{ClusterAdminClient, ConnectClient, SchemaRegistryClient};

/// The live-cluster clients of one backing cluster, supplied by the
/// embedding deployment.
#[derive(Clone)]
pub struct ClusterClients {
    pub admin: Arc<dyn ClusterAdminClient>,
    pub connect: Arc<dyn ConnectClient>,
    pub schema_registry: Arc<dyn SchemaRegistryClient>,
}

/// Fully wired control plane.
pub struct ControlPlane {
    pub store: Arc<InMemoryStore>,
    pub access: Arc<AccessControlService>,
    pub reconcilers: Arc<ReconcilerRegistry>,
    pub namespaces: NamespaceService,
    pub topics: TopicService,
    pub connectors: Arc<ConnectorService>,
    pub connect_clusters: Arc<ConnectClusterService>,
    pub schemas: SchemaService,
}

impl ControlPlane {
    /// Builds the control plane. Configured clusters without clients get no
    /// reconciler; operations targeting them fail with an upstream error
    /// instead of silently no-opping.
    pub fn build(config: GovConfig, mut clients: HashMap<String, ClusterClients>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let access = Arc::new(AccessControlService::new(store.clone(), store.clone()));

        let mut registry = ReconcilerRegistry::new();
        let mut registries: HashMap<String, Arc<dyn SchemaRegistryClient>> = HashMap::new();

        for cluster in &config.clusters {
            match clients.remove(&cluster.name) {
                Some(set) => {
                    registry.register_topic(Arc::new(TopicReconciler::new(
                        cluster.name.clone(),
                        set.admin,
                        store.clone(),
                        access.clone(),
                    )));
                    registry.register_connector(Arc::new(ConnectorReconciler::new(
                        cluster.name.clone(),
                        set.connect,
                        store.clone(),
                        access.clone(),
                    )));
                    registries.insert(cluster.name.clone(), set.schema_registry);
                    info!(cluster = %cluster.name, "cluster wired");
                }
                None => {
                    warn!(cluster = %cluster.name, "no clients supplied, reconciliation disabled for this cluster");
                }
            }
        }
        let reconcilers = Arc::new(registry);

        let namespaces = NamespaceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.clone(),
        );
        let topics = TopicService::new(
            store.clone(),
            access.clone(),
            reconcilers.clone(),
            config.clone(),
        );
        let connect_clusters = Arc::new(ConnectClusterService::new(
            store.clone(),
            store.clone(),
            access.clone(),
            reconcilers.clone(),
            config,
        ));
        let connectors = Arc::new(ConnectorService::new(
            store.clone(),
            access.clone(),
            reconcilers.clone(),
            connect_clusters.clone(),
        ));
        let schemas = SchemaService::new(registries, access.clone());

        Self {
            store,
            access,
            reconcilers,
            namespaces,
            topics,
            connectors,
            connect_clusters,
            schemas,
        }
    }
}
