use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::config::{ClusterProvider, GovConfig};
use crate::reconcile::ReconcilerRegistry;
use streamgov_access::AccessControlService;
use streamgov_core::{
    ADMIN_NAMESPACE, ApplyOutcome, CLEANUP_POLICY_COMPACT, CLEANUP_POLICY_CONFIG,
    CLEANUP_POLICY_DELETE, DeleteRecordsOutcome, GovernanceError, Namespace, PartitionOutcome,
    ResourceType, Result, Topic,
};
use streamgov_storage::TopicRepository;

// Broker-legal topic names: 249 chars max, restricted charset.
static TOPIC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]{1,249}$").unwrap_or_else(|_| unreachable!())
});

/// Topic governance: ownership-gated apply/delete with structural and
/// provider-specific validation, plus record deletion and drift listing.
pub struct TopicService {
    topics: Arc<dyn TopicRepository>,
    access: Arc<AccessControlService>,
    reconcilers: Arc<ReconcilerRegistry>,
    config: GovConfig,
}

impl TopicService {
    pub fn new(
        topics: Arc<dyn TopicRepository>,
        access: Arc<AccessControlService>,
        reconcilers: Arc<ReconcilerRegistry>,
        config: GovConfig,
    ) -> Self {
        Self {
            topics,
            access,
            reconcilers,
            config,
        }
    }

    /// Declared topics the namespace owns.
    pub async fn find_all_for_namespace(&self, ns: &Namespace) -> Result<Vec<Topic>> {
        let all = self.topics.find_all_for_cluster(ns.cluster()).await?;
        let grants = self.access.grants_received_by(ns).await?;
        Ok(all
            .into_iter()
            .filter(|topic| {
                grants
                    .iter()
                    .any(|ace| ace.establishes_ownership(ns.name(), ResourceType::Topic, topic.name()))
            })
            .collect())
    }

    pub async fn find_by_name(&self, ns: &Namespace, name: &str) -> Result<Option<Topic>> {
        Ok(self
            .find_all_for_namespace(ns)
            .await?
            .into_iter()
            .find(|topic| topic.name() == name))
    }

    /// Creates or updates a declared topic. All validation errors are
    /// aggregated and reject the mutation as a unit; dry-run runs the full
    /// pipeline without persisting.
    pub async fn apply(
        &self,
        ns: &Namespace,
        mut topic: Topic,
        dry_run: bool,
    ) -> Result<(Topic, ApplyOutcome)> {
        let name = topic.name().to_string();
        let mut errors = Vec::new();

        if !self.is_owner_or_admin(ns, &name).await? {
            errors.push(format!(
                "Invalid value {name} for name: Namespace is not owner of the topic."
            ));
        }

        errors.extend(self.validate_structurally(ns, &topic));

        let existing = self.topics.find_by_name(ns.cluster(), &name).await?;
        match &existing {
            None => {
                // Creation only: the live cluster treats `.` and `_` as the
                // same character in metric names.
                let collisions = self.reconcilers.topic(ns.cluster())?.find_collisions(&name).await?;
                if !collisions.is_empty() {
                    errors.push(format!(
                        "Invalid value {name} for name: Collides with existing topics: {}.",
                        collisions.join(", ")
                    ));
                }
            }
            Some(current) => {
                errors.extend(self.validate_update(ns, current, &topic));
            }
        }

        if !errors.is_empty() {
            return Err(GovernanceError::validation(Topic::KIND, name, errors));
        }

        let unchanged = existing.as_ref().is_some_and(|e| e.spec == topic.spec);
        let outcome = ApplyOutcome::of_apply(existing.is_some(), unchanged);
        topic.metadata.attribute(ns.name(), ns.cluster());

        if dry_run || !outcome.requires_persistence() {
            return Ok((topic, outcome));
        }

        debug!(cluster = ns.cluster(), topic = %name, %outcome, "applying topic");
        let created = self.topics.create(topic).await?;
        Ok((created, outcome))
    }

    /// Deletes a declared topic and propagates the deletion to the live
    /// cluster, live side first.
    pub async fn delete(&self, ns: &Namespace, name: &str, dry_run: bool) -> Result<()> {
        if !self.is_owner_or_admin(ns, name).await? {
            return Err(GovernanceError::validation(
                Topic::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Namespace is not owner of the topic."
                )],
            ));
        }

        let topic = self
            .topics
            .find_by_name(ns.cluster(), name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(Topic::KIND, name))?;

        if dry_run {
            return Ok(());
        }

        self.reconcilers.topic(ns.cluster())?.delete(&topic).await
    }

    /// Deletes all records of an owned topic, partition by partition.
    /// Compacted topics are rejected before any remote call. Dry-run
    /// reports the offsets that would become the low-water marks.
    pub async fn delete_records(
        &self,
        ns: &Namespace,
        name: &str,
        dry_run: bool,
    ) -> Result<DeleteRecordsOutcome> {
        if !self.is_owner_or_admin(ns, name).await? {
            return Err(GovernanceError::validation(
                Topic::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Namespace is not owner of the topic."
                )],
            ));
        }

        let topic = self
            .topics
            .find_by_name(ns.cluster(), name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(Topic::KIND, name))?;

        if topic.is_compacted() {
            return Err(GovernanceError::validation(
                Topic::KIND,
                name,
                vec![format!(
                    "Invalid value compact for configuration cleanup.policy: Cannot delete records on a compacted topic. Please delete and recreate the topic."
                )],
            ));
        }

        let reconciler = self.reconcilers.topic(ns.cluster())?;
        let offsets = reconciler.prepare_records_to_delete(name).await?;

        let mut outcome = DeleteRecordsOutcome::new(name);
        if dry_run {
            outcome.partitions = offsets
                .into_iter()
                .map(|(p, offset)| (p, PartitionOutcome::Deleted { low_water_mark: offset }))
                .collect();
            return Ok(outcome);
        }

        outcome.partitions = reconciler.delete_records(name, &offsets).await?;
        Ok(outcome)
    }

    /// Live topic names owned by the namespace but not declared.
    pub async fn list_unsynchronized_names(&self, ns: &Namespace) -> Result<Vec<String>> {
        self.reconcilers
            .topic(ns.cluster())?
            .list_unsynchronized_names(ns)
            .await
    }

    /// Full definitions of the unsynchronized topics, ready for import.
    pub async fn list_unsynchronized(&self, ns: &Namespace) -> Result<Vec<Topic>> {
        self.reconcilers
            .topic(ns.cluster())?
            .list_unsynchronized(ns)
            .await
    }

    async fn is_owner_or_admin(&self, ns: &Namespace, name: &str) -> Result<bool> {
        if ns.name() == ADMIN_NAMESPACE {
            return Ok(true);
        }
        self.access.is_owner(ns, ResourceType::Topic, name).await
    }

    fn validate_structurally(&self, ns: &Namespace, topic: &Topic) -> Vec<String> {
        let mut errors = Vec::new();

        if !TOPIC_NAME.is_match(topic.name()) {
            errors.push(format!(
                "Invalid value {} for name: Value must only contain ASCII alphanumerics, '.', '_' or '-', at most 249 characters.",
                topic.name()
            ));
        }
        if topic.spec.partitions < 1 {
            errors.push(format!(
                "Invalid value {} for configuration partitions: Value must be at least 1.",
                topic.spec.partitions
            ));
        }
        if topic.spec.replication_factor < 1 {
            errors.push(format!(
                "Invalid value {} for configuration replication.factor: Value must be at least 1.",
                topic.spec.replication_factor
            ));
        }
        if let Some(validator) = &ns.spec.topic_validator {
            errors.extend(validator.validate(topic));
        }
        errors
    }

    /// Update-only rules: partitions and replication factor are immutable,
    /// and some providers refuse a delete-to-compact cleanup transition.
    fn validate_update(&self, ns: &Namespace, current: &Topic, proposed: &Topic) -> Vec<String> {
        let mut errors = Vec::new();

        if proposed.spec.partitions != current.spec.partitions {
            errors.push(format!(
                "Invalid value {} for configuration partitions: Value is immutable ({}).",
                proposed.spec.partitions, current.spec.partitions
            ));
        }
        if proposed.spec.replication_factor != current.spec.replication_factor {
            errors.push(format!(
                "Invalid value {} for configuration replication.factor: Value is immutable ({}).",
                proposed.spec.replication_factor, current.spec.replication_factor
            ));
        }

        if self.config.provider(ns.cluster()) == ClusterProvider::ConfluentCloud
            && current.cleanup_policy() == Some(CLEANUP_POLICY_DELETE)
            && proposed.cleanup_policy() == Some(CLEANUP_POLICY_COMPACT)
        {
            errors.push(format!(
                "Invalid value compact for configuration {CLEANUP_POLICY_CONFIG}: Altering cleanup.policy from delete to compact is not currently supported. Please create a new topic with compact policy specified instead."
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    use crate::config::ClusterConfig;
    use crate::reconcile::TopicReconciler;
    use streamgov_core::{AceSpec, Metadata, NamespaceSpec, PatternType, Permission, TopicSpec, TopicValidator};
    use streamgov_db_memory::InMemoryStore;
    use streamgov_storage::{
        AccessControlRepository, ClientError, ClusterAdminClient, NamespaceRepository,
    };

    struct FakeAdmin {
        live: Mutex<Vec<String>>,
        offsets: BTreeMap<u32, i64>,
        deleted_records: Mutex<Vec<String>>,
    }

    impl FakeAdmin {
        fn new(live: &[&str]) -> Self {
            Self {
                live: Mutex::new(live.iter().map(|n| n.to_string()).collect()),
                offsets: BTreeMap::from([(0, 10), (1, 20)]),
                deleted_records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClusterAdminClient for FakeAdmin {
        async fn list_topic_names(&self) -> std::result::Result<Vec<String>, ClientError> {
            Ok(self.live.lock().unwrap().clone())
        }

        async fn collect_topics(
            &self,
            _names: &[String],
        ) -> std::result::Result<HashMap<String, Topic>, ClientError> {
            Ok(HashMap::new())
        }

        async fn delete_topic(&self, name: &str) -> std::result::Result<(), ClientError> {
            self.live.lock().unwrap().retain(|n| n != name);
            Ok(())
        }

        async fn prepare_records_to_delete(
            &self,
            _topic: &str,
        ) -> std::result::Result<BTreeMap<u32, i64>, ClientError> {
            Ok(self.offsets.clone())
        }

        async fn delete_records(
            &self,
            topic: &str,
            before_offsets: &BTreeMap<u32, i64>,
        ) -> std::result::Result<BTreeMap<u32, PartitionOutcome>, ClientError> {
            self.deleted_records.lock().unwrap().push(topic.to_string());
            Ok(before_offsets
                .iter()
                .map(|(p, o)| (*p, PartitionOutcome::Deleted { low_water_mark: *o }))
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

    fn topic(name: &str, partitions: u32, configs: &[(&str, &str)]) -> Topic {
        Topic::new(
            Metadata::new(name).with_cluster("local"),
            TopicSpec {
                partitions,
                replication_factor: 3,
                configs: configs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<IndexMap<_, _>>(),
            },
        )
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        admin: Arc<FakeAdmin>,
        service: TopicService,
    }

    async fn fixture(provider: ClusterProvider, live: &[&str]) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let ns_repo: &dyn NamespaceRepository = store.as_ref();
        ns_repo.create(namespace("finance")).await.unwrap();

        let ace_repo: &dyn AccessControlRepository = store.as_ref();
        ace_repo
            .create(streamgov_core::AccessControlEntry::new(
                Metadata::new("acl-fin")
                    .with_namespace("finance")
                    .with_cluster("local"),
                AceSpec {
                    resource_type: ResourceType::Topic,
                    resource: "fin.".to_string(),
                    pattern_type: PatternType::Prefixed,
                    permission: Permission::Owner,
                    granted_to: "finance".to_string(),
                },
            ))
            .await
            .unwrap();

        let access = Arc::new(AccessControlService::new(store.clone(), store.clone()));
        let admin = Arc::new(FakeAdmin::new(live));
        let mut registry = ReconcilerRegistry::new();
        registry.register_topic(Arc::new(TopicReconciler::new(
            "local",
            admin.clone(),
            store.clone(),
            access.clone(),
        )));

        let config = GovConfig {
            clusters: vec![ClusterConfig {
                name: "local".to_string(),
                provider,
                connects: IndexMap::new(),
            }],
        };

        let service = TopicService::new(store.clone(), access, Arc::new(registry), config);
        Fixture { store, admin, service }
    }

    #[tokio::test]
    async fn test_apply_owned_topic_created() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        let (created, outcome) = fx
            .service
            .apply(&fin, topic("fin.orders", 3, &[]), false)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Created);
        assert_eq!(created.metadata.namespace, "finance");
        assert!(created.metadata.creation_timestamp.is_some());

        assert!(fx.service.find_by_name(&fin, "fin.orders").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_apply_foreign_name_rejected_with_ownership_error() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, topic("mkt.orders", 3, &[]), false)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.validation_errors().iter().any(|e| e.contains("not owner")));
    }

    #[tokio::test]
    async fn test_reapply_identical_spec_unchanged() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        let t = topic("fin.orders", 3, &[("retention.ms", "60000")]);
        let (_, first) = fx.service.apply(&fin, t.clone(), false).await.unwrap();
        assert_eq!(first, ApplyOutcome::Created);

        let (_, second) = fx.service.apply(&fin, t, false).await.unwrap();
        assert_eq!(second, ApplyOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_dry_run_validates_but_persists_nothing() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        let (_, outcome) = fx
            .service
            .apply(&fin, topic("fin.orders", 3, &[]), true)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Created);
        assert!(fx.service.find_by_name(&fin, "fin.orders").await.unwrap().is_none());

        // Dry-run still rejects invalid input.
        assert!(fx.service.apply(&fin, topic("mkt.x", 3, &[]), true).await.is_err());
    }

    #[tokio::test]
    async fn test_partitions_immutable_error_names_both_values() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        fx.service.apply(&fin, topic("fin.orders", 3, &[]), false).await.unwrap();
        let err = fx
            .service
            .apply(&fin, topic("fin.orders", 6, &[]), false)
            .await
            .unwrap_err();
        assert_eq!(
            err.validation_errors(),
            ["Invalid value 6 for configuration partitions: Value is immutable (3)."]
        );
    }

    #[tokio::test]
    async fn test_confluent_cloud_rejects_delete_to_compact() {
        let fx = fixture(ClusterProvider::ConfluentCloud, &[]).await;
        let fin = namespace("finance");

        fx.service
            .apply(&fin, topic("fin.orders", 3, &[("cleanup.policy", "delete")]), false)
            .await
            .unwrap();
        let err = fx
            .service
            .apply(&fin, topic("fin.orders", 3, &[("cleanup.policy", "compact")]), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("cleanup.policy"));

        // The same transition is legal on a self-managed cluster.
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        fx.service
            .apply(&fin, topic("fin.orders", 3, &[("cleanup.policy", "delete")]), false)
            .await
            .unwrap();
        let (_, outcome) = fx
            .service
            .apply(&fin, topic("fin.orders", 3, &[("cleanup.policy", "compact")]), false)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Changed);
    }

    #[tokio::test]
    async fn test_collision_with_live_topic_rejected_on_create() {
        let fx = fixture(ClusterProvider::SelfManaged, &["fin_orders"]).await;
        let fin = namespace("finance");

        let err = fx
            .service
            .apply(&fin, topic("fin.orders", 3, &[]), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("fin_orders"));
    }

    #[tokio::test]
    async fn test_namespace_validator_constraints_enforced() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let mut fin = namespace("finance");
        fin.spec.topic_validator = Some(TopicValidator {
            max_partitions: Some(6),
            max_replication_factor: Some(3),
            required_configs: vec!["cleanup.policy".to_string()],
        });

        let err = fx
            .service
            .apply(&fin, topic("fin.orders", 12, &[]), false)
            .await
            .unwrap_err();
        // Both violations reported at once.
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let admin_ns = namespace(ADMIN_NAMESPACE);

        let err = fx
            .service
            .apply(&admin_ns, topic("bad name!", 3, &[]), false)
            .await
            .unwrap_err();
        assert!(err.validation_errors()[0].contains("for name"));
    }

    #[tokio::test]
    async fn test_delete_propagates_to_live_cluster() {
        let fx = fixture(ClusterProvider::SelfManaged, &["fin.orders"]).await;
        let fin = namespace("finance");
        fx.service.apply(&fin, topic("fin.orders", 3, &[]), false).await.unwrap();

        fx.service.delete(&fin, "fin.orders", false).await.unwrap();
        assert!(fx.admin.live.lock().unwrap().is_empty());
        assert!(fx.service.find_by_name(&fin, "fin.orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_topic_not_found() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");

        let err = fx.service.delete(&fin, "fin.ghost", false).await.unwrap_err();
        assert!(matches!(err, GovernanceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_records_rejects_compacted_before_remote_call() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");
        fx.service
            .apply(&fin, topic("fin.compact", 3, &[("cleanup.policy", "compact")]), false)
            .await
            .unwrap();

        let err = fx
            .service
            .delete_records(&fin, "fin.compact", false)
            .await
            .unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
        assert!(err.validation_errors()[0].contains("compacted"));
        assert!(fx.admin.deleted_records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_records_reports_low_water_marks() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");
        fx.service.apply(&fin, topic("fin.orders", 3, &[]), false).await.unwrap();

        let outcome = fx.service.delete_records(&fin, "fin.orders", false).await.unwrap();
        assert!(outcome.all_succeeded());
        assert_eq!(
            outcome.partitions[&0],
            PartitionOutcome::Deleted { low_water_mark: 10 }
        );
        assert_eq!(
            outcome.partitions[&1],
            PartitionOutcome::Deleted { low_water_mark: 20 }
        );
    }

    #[tokio::test]
    async fn test_delete_records_dry_run_issues_no_deletion() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");
        fx.service.apply(&fin, topic("fin.orders", 3, &[]), false).await.unwrap();

        let outcome = fx.service.delete_records(&fin, "fin.orders", true).await.unwrap();
        assert!(outcome.all_succeeded());
        assert_eq!(outcome.partitions.len(), 2);
        assert!(fx.admin.deleted_records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_all_restricted_to_owned_topics() {
        let fx = fixture(ClusterProvider::SelfManaged, &[]).await;
        let fin = namespace("finance");
        fx.service.apply(&fin, topic("fin.orders", 3, &[]), false).await.unwrap();

        // Foreign topic placed directly in the store.
        let repo: &dyn TopicRepository = fx.store.as_ref();
        repo.create(topic("mkt.orders", 3, &[])).await.unwrap();

        let owned = fx.service.find_all_for_namespace(&fin).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name(), "fin.orders");
    }
}
