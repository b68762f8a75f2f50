use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GovConfig;
use streamgov_core::{
    ApplyOutcome, ConnectCluster, Connector, GovernanceError, Namespace, Result, Topic,
};
use streamgov_storage::{
    AccessControlRepository, ConnectClusterRepository, ConnectorRepository, NamespaceRepository,
    TopicRepository,
};

/// Namespace administration. All mutations here are admin-scoped: tenants
/// never create or delete their own namespace.
pub struct NamespaceService {
    namespaces: Arc<dyn NamespaceRepository>,
    topics: Arc<dyn TopicRepository>,
    connectors: Arc<dyn ConnectorRepository>,
    connect_clusters: Arc<dyn ConnectClusterRepository>,
    entries: Arc<dyn AccessControlRepository>,
    config: GovConfig,
}

impl NamespaceService {
    pub fn new(
        namespaces: Arc<dyn NamespaceRepository>,
        topics: Arc<dyn TopicRepository>,
        connectors: Arc<dyn ConnectorRepository>,
        connect_clusters: Arc<dyn ConnectClusterRepository>,
        entries: Arc<dyn AccessControlRepository>,
        config: GovConfig,
    ) -> Self {
        Self {
            namespaces,
            topics,
            connectors,
            connect_clusters,
            entries,
            config,
        }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>> {
        Ok(self.namespaces.find_by_name(name).await?)
    }

    pub async fn list_all(&self, cluster: &str) -> Result<Vec<Namespace>> {
        Ok(self.namespaces.find_all_for_cluster(cluster).await?)
    }

    /// Validation shared by create and update: every referenced connect
    /// cluster must be pre-configured on the namespace's cluster.
    pub fn validate(&self, ns: &Namespace) -> Vec<String> {
        ns.spec
            .connect_clusters
            .iter()
            .filter(|cc| !self.config.has_connect(ns.cluster(), cc))
            .map(|cc| format!("Invalid value {cc} for connectClusters: Connect cluster doesn't exist."))
            .collect()
    }

    /// Creation-only validation: the backing cluster must exist and the
    /// principal must be unique within it.
    pub async fn validate_creation(&self, ns: &Namespace) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        if !self.config.has_cluster(ns.cluster()) {
            errors.push(format!(
                "Invalid value {} for cluster: Cluster doesn't exist.",
                ns.cluster()
            ));
            return Ok(errors);
        }

        let peers = self.namespaces.find_all_for_cluster(ns.cluster()).await?;
        if peers
            .iter()
            .any(|peer| peer.name() != ns.name() && peer.spec.principal == ns.spec.principal)
        {
            errors.push(format!(
                "Invalid value {} for principal: Principal already used by another namespace.",
                ns.spec.principal
            ));
        }
        Ok(errors)
    }

    /// Creates or updates a namespace. The backing cluster is immutable
    /// once set.
    pub async fn apply(
        &self,
        mut namespace: Namespace,
        dry_run: bool,
    ) -> Result<(Namespace, ApplyOutcome)> {
        let name = namespace.name().to_string();
        let existing = self.namespaces.find_by_name(&name).await?;

        let mut errors = Vec::new();
        match &existing {
            None => errors.extend(self.validate_creation(&namespace).await?),
            Some(current) if current.cluster() != namespace.cluster() => {
                errors.push(format!(
                    "Invalid value {} for cluster: Value is immutable ({}).",
                    namespace.cluster(),
                    current.cluster()
                ));
            }
            Some(_) => {}
        }
        errors.extend(self.validate(&namespace));

        if !errors.is_empty() {
            return Err(GovernanceError::validation(Namespace::KIND, name, errors));
        }

        let unchanged = existing.as_ref().is_some_and(|e| e.spec == namespace.spec);
        let outcome = ApplyOutcome::of_apply(existing.is_some(), unchanged);
        let cluster = namespace.metadata.cluster.clone();
        namespace.metadata.attribute(&name, &cluster);

        if dry_run || !outcome.requires_persistence() {
            return Ok((namespace, outcome));
        }

        debug!(namespace = %name, cluster = %cluster, %outcome, "applying namespace");
        let created = self.namespaces.create(namespace).await?;
        Ok((created, outcome))
    }

    /// Every declared resource attributed to the namespace, as `Kind/name`
    /// references.
    pub async fn list_all_resources(&self, ns: &Namespace) -> Result<Vec<String>> {
        let mut resources = Vec::new();
        let cluster = ns.cluster();

        for topic in self.topics.find_all_for_cluster(cluster).await? {
            if topic.metadata.namespace == ns.name() {
                resources.push(format!("{}/{}", Topic::KIND, topic.metadata.name));
            }
        }
        for connector in self.connectors.find_all_for_cluster(cluster).await? {
            if connector.metadata.namespace == ns.name() {
                resources.push(format!("{}/{}", Connector::KIND, connector.metadata.name));
            }
        }
        for cc in self.connect_clusters.find_all_for_cluster(cluster).await? {
            if cc.metadata.namespace == ns.name() {
                resources.push(format!("{}/{}", ConnectCluster::KIND, cc.metadata.name));
            }
        }
        Ok(resources)
    }

    /// Deletes a namespace once it holds no declared resources. Its access
    /// control entries, as grantor or grantee, are removed with it.
    pub async fn delete(&self, name: &str, dry_run: bool) -> Result<()> {
        let namespace = self
            .namespaces
            .find_by_name(name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(Namespace::KIND, name))?;

        let resources = self.list_all_resources(&namespace).await?;
        if !resources.is_empty() {
            return Err(GovernanceError::validation(
                Namespace::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Namespace resources must be deleted first: {}.",
                    resources.join(", ")
                )],
            ));
        }

        if dry_run {
            return Ok(());
        }

        let entries = self.entries.find_all_for_cluster(namespace.cluster()).await?;
        for entry in entries {
            if entry.grantor() == name || entry.spec.granted_to == name {
                self.entries.delete(&entry).await?;
            }
        }

        info!(namespace = name, cluster = namespace.cluster(), "deleted namespace");
        Ok(self.namespaces.delete(&namespace).await?)
    }
}
