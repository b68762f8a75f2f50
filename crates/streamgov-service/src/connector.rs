use futures_util::future;
use std::sync::Arc;
use tracing::{debug, info};

use crate::connect_cluster::ConnectClusterService;
use crate::reconcile::ReconcilerRegistry;
use streamgov_access::AccessControlService;
use streamgov_core::{
    ADMIN_NAMESPACE, ApplyOutcome, Connector, ConnectorStatus, GovernanceError, Namespace,
    ResourceType, Result,
};
use streamgov_storage::ConnectorRepository;

/// Connector governance: ownership-gated lifecycle with local validation
/// followed by worker-side validation, both folded into one error list.
pub struct ConnectorService {
    connectors: Arc<dyn ConnectorRepository>,
    access: Arc<AccessControlService>,
    reconcilers: Arc<ReconcilerRegistry>,
    connect_clusters: Arc<ConnectClusterService>,
}

impl ConnectorService {
    pub fn new(
        connectors: Arc<dyn ConnectorRepository>,
        access: Arc<AccessControlService>,
        reconcilers: Arc<ReconcilerRegistry>,
        connect_clusters: Arc<ConnectClusterService>,
    ) -> Self {
        Self {
            connectors,
            access,
            reconcilers,
            connect_clusters,
        }
    }

    /// Declared connectors the namespace owns.
    pub async fn find_all_for_namespace(&self, ns: &Namespace) -> Result<Vec<Connector>> {
        let all = self.connectors.find_all_for_cluster(ns.cluster()).await?;
        let grants = self.access.grants_received_by(ns).await?;
        Ok(all
            .into_iter()
            .filter(|connector| {
                grants.iter().any(|ace| {
                    ace.establishes_ownership(ns.name(), ResourceType::Connect, connector.name())
                })
            })
            .collect())
    }

    pub async fn find_by_name(&self, ns: &Namespace, name: &str) -> Result<Option<Connector>> {
        Ok(self
            .find_all_for_namespace(ns)
            .await?
            .into_iter()
            .find(|connector| connector.name() == name))
    }

    /// Local structural validation: target connect cluster, connector class
    /// presence and plugin existence, namespace class allow-list. Runs
    /// before any worker-side validation.
    pub async fn validate_locally(&self, ns: &Namespace, connector: &Connector) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let target = &connector.spec.connect_cluster;

        let allowed = self.connect_clusters.allowed_for(ns).await?;
        if !allowed.iter().any(|cc| cc == target) {
            errors.push(format!(
                "Invalid value {target} for spec.connectCluster: Value must be one of [{}].",
                allowed.join(", ")
            ));
            return Ok(errors);
        }

        let Some(class) = connector.class() else {
            errors.push(
                "Invalid value for spec.config.'connector.class': Value must be non-null."
                    .to_string(),
            );
            return Ok(errors);
        };

        let connect = self.reconcilers.connector(ns.cluster())?.connect();
        match connect.list_plugins(target).await {
            Ok(plugins) => {
                if !plugins.iter().any(|plugin| plugin.class == class) {
                    errors.push(format!(
                        "Invalid value {class} for spec.config.'connector.class': Failed to find any class that implements Connector and which name matches {class}."
                    ));
                }
            }
            // Fail closed: an unreachable worker rejects the declaration.
            Err(e) => errors.push(format!(
                "Invalid value {target} for spec.connectCluster: Failed to list connector plugins ({e})."
            )),
        }

        if let Some(validator) = &ns.spec.connector_validator {
            errors.extend(validator.validate_class(class));
        }
        Ok(errors)
    }

    /// Worker-side configuration validation against the connector plugin.
    pub async fn validate_remotely(&self, ns: &Namespace, connector: &Connector) -> Result<Vec<String>> {
        let Some(class) = connector.class() else {
            return Ok(vec![
                "Invalid value for spec.config.'connector.class': Value must be non-null."
                    .to_string(),
            ]);
        };

        let config: Vec<(String, String)> = connector
            .spec
            .config
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let connect = self.reconcilers.connector(ns.cluster())?.connect();
        match connect
            .validate(&connector.spec.connect_cluster, class, &config)
            .await
        {
            Ok(report) => Ok(report.errors),
            Err(e) => Ok(vec![format!(
                "Invalid connector configuration: Worker-side validation failed ({e})."
            )]),
        }
    }

    /// Creates or updates a declared connector. Local errors are collected
    /// first; the worker is only consulted when the declaration is locally
    /// sound.
    pub async fn apply(
        &self,
        ns: &Namespace,
        mut connector: Connector,
        dry_run: bool,
    ) -> Result<(Connector, ApplyOutcome)> {
        let name = connector.name().to_string();
        let mut errors = Vec::new();

        if !self.is_owner_or_admin(ns, &name).await? {
            errors.push(format!(
                "Invalid value {name} for name: Namespace is not owner of the connector."
            ));
        }
        errors.extend(self.validate_locally(ns, &connector).await?);
        if !errors.is_empty() {
            return Err(GovernanceError::validation(Connector::KIND, name, errors));
        }

        let remote_errors = self.validate_remotely(ns, &connector).await?;
        if !remote_errors.is_empty() {
            return Err(GovernanceError::validation(Connector::KIND, name, remote_errors));
        }

        let existing = self.connectors.find_by_name(ns.cluster(), &name).await?;
        let unchanged = existing.as_ref().is_some_and(|e| e.spec == connector.spec);
        let outcome = ApplyOutcome::of_apply(existing.is_some(), unchanged);
        connector.metadata.attribute(ns.name(), ns.cluster());

        if dry_run || !outcome.requires_persistence() {
            return Ok((connector, outcome));
        }

        debug!(cluster = ns.cluster(), connector = %name, %outcome, "applying connector");
        let created = self.connectors.create(connector).await?;
        Ok((created, outcome))
    }

    /// Deletes a declared connector and removes it from the worker, worker
    /// first.
    pub async fn delete(&self, ns: &Namespace, name: &str, dry_run: bool) -> Result<()> {
        let connector = self.owned_connector(ns, name).await?;
        if dry_run {
            return Ok(());
        }
        self.reconcilers.connector(ns.cluster())?.delete(&connector).await
    }

    /// Restarts every task of the connector, fanned out concurrently.
    pub async fn restart(&self, ns: &Namespace, name: &str) -> Result<ConnectorStatus> {
        let connector = self.owned_connector(ns, name).await?;
        let connect = self.reconcilers.connector(ns.cluster())?.connect();

        let status = connect
            .status(&connector.spec.connect_cluster, name)
            .await?;
        future::try_join_all(status.tasks.iter().map(|task| {
            connect.restart_task(&connector.spec.connect_cluster, name, task.id)
        }))
        .await?;

        info!(cluster = ns.cluster(), connector = name, tasks = status.tasks.len(), "restarted connector");
        Ok(connect.status(&connector.spec.connect_cluster, name).await?)
    }

    pub async fn pause(&self, ns: &Namespace, name: &str) -> Result<()> {
        let connector = self.owned_connector(ns, name).await?;
        let connect = self.reconcilers.connector(ns.cluster())?.connect();
        Ok(connect.pause(&connector.spec.connect_cluster, name).await?)
    }

    pub async fn resume(&self, ns: &Namespace, name: &str) -> Result<()> {
        let connector = self.owned_connector(ns, name).await?;
        let connect = self.reconcilers.connector(ns.cluster())?.connect();
        Ok(connect.resume(&connector.spec.connect_cluster, name).await?)
    }

    /// Deployed connectors owned by the namespace but not declared, across
    /// every connect cluster it may target.
    pub async fn list_unsynchronized(&self, ns: &Namespace) -> Result<Vec<Connector>> {
        let allowed = self.connect_clusters.allowed_for(ns).await?;
        self.reconcilers
            .connector(ns.cluster())?
            .list_unsynchronized(ns, &allowed)
            .await
    }

    async fn is_owner_or_admin(&self, ns: &Namespace, name: &str) -> Result<bool> {
        if ns.name() == ADMIN_NAMESPACE {
            return Ok(true);
        }
        self.access.is_owner(ns, ResourceType::Connect, name).await
    }

    async fn owned_connector(&self, ns: &Namespace, name: &str) -> Result<Connector> {
        if !self.is_owner_or_admin(ns, name).await? {
            return Err(GovernanceError::validation(
                Connector::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Namespace is not owner of the connector."
                )],
            ));
        }
        self.connectors
            .find_by_name(ns.cluster(), name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(Connector::KIND, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::sync::Mutex;

    use crate::config::{ClusterConfig, ClusterProvider, ConnectWorkerConfig, GovConfig};
    use crate::reconcile::ConnectorReconciler;
    use streamgov_core::{
        AceSpec, CONNECTOR_CLASS_CONFIG, ConnectClusterSpec, ConnectorSpec, ConnectorValidator,
        Metadata, NamespaceSpec, PatternType, Permission, TaskState,
    };
    use streamgov_db_memory::InMemoryStore;
    use streamgov_storage::{
        AccessControlRepository, ClientError, ConfigValidationReport, ConnectClient,
        NamespaceRepository, PluginInfo,
    };

    #[derive(Default)]
    struct FakeConnect {
        plugins: Vec<String>,
        validation_errors: Vec<String>,
        deployed: Vec<Connector>,
        restarted: Mutex<Vec<u32>>,
        paused: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConnectClient for FakeConnect {
        async fn list_plugins(
            &self,
            _connect_cluster: &str,
        ) -> std::result::Result<Vec<PluginInfo>, ClientError> {
            Ok(self
                .plugins
                .iter()
                .map(|class| PluginInfo {
                    class: class.clone(),
                    plugin_type: "sink".to_string(),
                    version: "1.0".to_string(),
                })
                .collect())
        }

        async fn validate(
            &self,
            _connect_cluster: &str,
            _connector_class: &str,
            _config: &[(String, String)],
        ) -> std::result::Result<ConfigValidationReport, ClientError> {
            Ok(ConfigValidationReport {
                error_count: self.validation_errors.len() as u32,
                errors: self.validation_errors.clone(),
            })
        }

        async fn list_connectors(
            &self,
            _connect_cluster: &str,
        ) -> std::result::Result<Vec<Connector>, ClientError> {
            Ok(self.deployed.clone())
        }

        async fn delete_connector(
            &self,
            _connect_cluster: &str,
            _name: &str,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }

        async fn status(
            &self,
            _connect_cluster: &str,
            _name: &str,
        ) -> std::result::Result<ConnectorStatus, ClientError> {
            Ok(ConnectorStatus {
                state: "RUNNING".to_string(),
                tasks: vec![
                    TaskState { id: 0, state: "RUNNING".to_string(), trace: None },
                    TaskState { id: 1, state: "FAILED".to_string(), trace: None },
                ],
            })
        }

        async fn restart_task(
            &self,
            _connect_cluster: &str,
            _name: &str,
            task_id: u32,
        ) -> std::result::Result<(), ClientError> {
            self.restarted.lock().unwrap().push(task_id);
            Ok(())
        }

        async fn pause(
            &self,
            _connect_cluster: &str,
            name: &str,
        ) -> std::result::Result<(), ClientError> {
            self.paused.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn resume(
            &self,
            _connect_cluster: &str,
            _name: &str,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }

        async fn test_connection(
            &self,
            _spec: &ConnectClusterSpec,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }
    }

    fn namespace(name: &str) -> Namespace {
        Namespace::new(
            Metadata::new(name).with_cluster("local"),
            NamespaceSpec {
                principal: format!("user-{name}"),
                connect_clusters: vec!["connect-main".to_string()],
                topic_validator: None,
                connector_validator: None,
            },
        )
    }

    fn connector(name: &str, connect_cluster: &str, class: Option<&str>) -> Connector {
        let mut config = IndexMap::new();
        if let Some(class) = class {
            config.insert(CONNECTOR_CLASS_CONFIG.to_string(), class.to_string());
        }
        Connector::new(
            Metadata::new(name).with_cluster("local"),
            ConnectorSpec {
                connect_cluster: connect_cluster.to_string(),
                config,
            },
        )
    }

    struct Fixture {
        connect: Arc<FakeConnect>,
        service: ConnectorService,
    }

    async fn fixture(connect: FakeConnect) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let ns_repo: &dyn NamespaceRepository = store.as_ref();
        ns_repo.create(namespace("finance")).await.unwrap();

        let ace_repo: &dyn AccessControlRepository = store.as_ref();
        ace_repo
            .create(streamgov_core::AccessControlEntry::new(
                Metadata::new("acl-fin").with_namespace("finance").with_cluster("local"),
                AceSpec {
                    resource_type: ResourceType::Connect,
                    resource: "fin.".to_string(),
                    pattern_type: PatternType::Prefixed,
                    permission: Permission::Owner,
                    granted_to: "finance".to_string(),
                },
            ))
            .await
            .unwrap();

        let access = Arc::new(AccessControlService::new(store.clone(), store.clone()));
        let connect = Arc::new(connect);
        let mut registry = ReconcilerRegistry::new();
        registry.register_connector(Arc::new(ConnectorReconciler::new(
            "local",
            connect.clone(),
            store.clone(),
            access.clone(),
        )));
        let registry = Arc::new(registry);

        let config = GovConfig {
            clusters: vec![ClusterConfig {
                name: "local".to_string(),
                provider: ClusterProvider::SelfManaged,
                connects: IndexMap::from([(
                    "connect-main".to_string(),
                    ConnectWorkerConfig {
                        url: "http://connect-main:8083".to_string(),
                        username: None,
                        password: None,
                    },
                )]),
            }],
        };

        let connect_clusters = Arc::new(ConnectClusterService::new(
            store.clone(),
            store.clone(),
            access.clone(),
            registry.clone(),
            config,
        ));
        let service = ConnectorService::new(store, access, registry, connect_clusters);
        Fixture { connect, service }
    }

    fn sink() -> FakeConnect {
        FakeConnect {
            plugins: vec!["io.example.JdbcSink".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_apply_valid_connector_created() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");

        let (created, outcome) = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", Some("io.example.JdbcSink")), false)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Created);
        assert_eq!(created.metadata.namespace, "finance");
    }

    #[tokio::test]
    async fn test_disallowed_connect_cluster_rejected() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-other", Some("io.example.JdbcSink")), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("spec.connectCluster"));
        assert!(err.validation_errors()[0].contains("connect-main"));
    }

    #[tokio::test]
    async fn test_missing_class_rejected() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", None), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("non-null"));
    }

    #[tokio::test]
    async fn test_unknown_plugin_class_rejected() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", Some("org.ghost.Class")), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("org.ghost.Class"));
    }

    #[tokio::test]
    async fn test_namespace_class_allow_list_enforced() {
        let fx = fixture(FakeConnect {
            plugins: vec!["io.example.JdbcSink".to_string(), "org.other.Sink".to_string()],
            ..Default::default()
        })
        .await;
        let mut fin = namespace("finance");
        fin.spec.connector_validator = Some(ConnectorValidator {
            allowed_classes: vec!["io.example.JdbcSink".to_string()],
        });

        let err = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", Some("org.other.Sink")), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("not allowed"));
    }

    #[tokio::test]
    async fn test_worker_validation_errors_fold_into_rejection() {
        let fx = fixture(FakeConnect {
            plugins: vec!["io.example.JdbcSink".to_string()],
            validation_errors: vec![
                "Missing required configuration \"connection.url\"".to_string(),
            ],
            ..Default::default()
        })
        .await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", Some("io.example.JdbcSink")), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("connection.url"));
    }

    #[tokio::test]
    async fn test_dry_run_persists_nothing() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");

        let (_, outcome) = fx
            .service
            .apply(&fin, connector("fin.sink", "connect-main", Some("io.example.JdbcSink")), true)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Created);
        assert!(fx.service.find_by_name(&fin, "fin.sink").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restart_fans_out_per_task() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");
        fx.service
            .apply(&fin, connector("fin.sink", "connect-main", Some("io.example.JdbcSink")), false)
            .await
            .unwrap();

        fx.service.restart(&fin, "fin.sink").await.unwrap();
        let mut restarted = fx.connect.restarted.lock().unwrap().clone();
        restarted.sort_unstable();
        assert_eq!(restarted, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_pause_requires_ownership() {
        let fx = fixture(sink()).await;
        let fin = namespace("finance");
        fx.service
            .apply(&fin, connector("fin.sink", "connect-main", Some("io.example.JdbcSink")), false)
            .await
            .unwrap();

        fx.service.pause(&fin, "fin.sink").await.unwrap();
        assert_eq!(*fx.connect.paused.lock().unwrap(), vec!["fin.sink"]);

        let mut mkt = namespace("marketing");
        mkt.spec.principal = "user-marketing".to_string();
        let err = fx.service.pause(&mkt, "fin.sink").await.unwrap_err();
        assert!(err.validation_errors()[0].contains("not owner"));
    }

    #[tokio::test]
    async fn test_list_unsynchronized_owned_undeclared_only() {
        let fx = fixture(FakeConnect {
            plugins: vec!["io.example.JdbcSink".to_string()],
            deployed: vec![
                connector("fin.orphan", "connect-main", Some("io.example.JdbcSink")),
                connector("mkt.other", "connect-main", Some("io.example.JdbcSink")),
            ],
            ..Default::default()
        })
        .await;
        let fin = namespace("finance");

        let drift = fx.service.list_unsynchronized(&fin).await.unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].name(), "fin.orphan");

        // Once declared, the connector is synchronized.
        fx.service
            .apply(&fin, connector("fin.orphan", "connect-main", Some("io.example.JdbcSink")), false)
            .await
            .unwrap();
        assert!(fx.service.list_unsynchronized(&fin).await.unwrap().is_empty());
    }
}
