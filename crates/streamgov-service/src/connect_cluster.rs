use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::GovConfig;
use crate::reconcile::ReconcilerRegistry;
use crate::vault::{self, VaultResponse};
use streamgov_access::AccessControlService;
use streamgov_core::{
    ADMIN_NAMESPACE, ApplyOutcome, ConnectCluster, GovernanceError, Namespace, Permission,
    ResourceType, Result,
};
use streamgov_storage::{ConnectClusterRepository, ConnectorRepository};

const VAULT_KEY_SIZE: usize = 32;

/// Governance over self-deployed connect clusters: declaration with
/// reachability checks, deployment-target resolution and the secret vault.
pub struct ConnectClusterService {
    connect_clusters: Arc<dyn ConnectClusterRepository>,
    connectors: Arc<dyn ConnectorRepository>,
    access: Arc<AccessControlService>,
    reconcilers: Arc<ReconcilerRegistry>,
    config: GovConfig,
}

impl ConnectClusterService {
    pub fn new(
        connect_clusters: Arc<dyn ConnectClusterRepository>,
        connectors: Arc<dyn ConnectorRepository>,
        access: Arc<AccessControlService>,
        reconcilers: Arc<ReconcilerRegistry>,
        config: GovConfig,
    ) -> Self {
        Self {
            connect_clusters,
            connectors,
            access,
            reconcilers,
            config,
        }
    }

    /// Self-deployed clusters the namespace owns: the manage relation, used
    /// for create and delete of the declaration itself.
    pub async fn find_all_by_namespace_owner(&self, ns: &Namespace) -> Result<Vec<ConnectCluster>> {
        let all = self.connect_clusters.find_all_for_cluster(ns.cluster()).await?;
        let grants = self.access.grants_received_by(ns).await?;
        Ok(all
            .into_iter()
            .filter(|cc| {
                grants.iter().any(|ace| {
                    ace.establishes_ownership(ns.name(), ResourceType::ConnectCluster, cc.name())
                })
            })
            .collect())
    }

    /// Self-deployed clusters the namespace may deploy to: OWNER or WRITE
    /// grants. The use relation, weaker than manage.
    pub async fn find_all_by_namespace_write(&self, ns: &Namespace) -> Result<Vec<ConnectCluster>> {
        let all = self.connect_clusters.find_all_for_cluster(ns.cluster()).await?;
        let grants = self.access.grants_received_by(ns).await?;
        Ok(all
            .into_iter()
            .filter(|cc| {
                grants.iter().any(|ace| {
                    matches!(ace.spec.permission, Permission::Owner | Permission::Write)
                        && ace.spec.resource_type == ResourceType::ConnectCluster
                        && ace.spec.matches(cc.name())
                })
            })
            .collect())
    }

    /// Whether the namespace may target the named connect cluster for a
    /// deployment: its declared allow-list plus any writable self-deployed
    /// cluster.
    pub async fn is_allowed(&self, ns: &Namespace, name: &str) -> Result<bool> {
        if ns.spec.connect_clusters.iter().any(|cc| cc == name) {
            return Ok(true);
        }
        Ok(self
            .find_all_by_namespace_write(ns)
            .await?
            .iter()
            .any(|cc| cc.name() == name))
    }

    /// All connect-cluster names the namespace may deploy to, allow-list
    /// first, declaration order preserved.
    pub async fn allowed_for(&self, ns: &Namespace) -> Result<Vec<String>> {
        let mut names = ns.spec.connect_clusters.clone();
        for cc in self.find_all_by_namespace_write(ns).await? {
            if !names.iter().any(|n| n == cc.name()) {
                names.push(cc.name().to_string());
            }
        }
        Ok(names)
    }

    /// Declares a self-deployed connect cluster. The worker must be
    /// reachable before the declaration is accepted.
    pub async fn apply(
        &self,
        ns: &Namespace,
        mut connect_cluster: ConnectCluster,
        dry_run: bool,
    ) -> Result<(ConnectCluster, ApplyOutcome)> {
        let name = connect_cluster.name().to_string();
        let mut errors = Vec::new();

        if !self.is_owner_or_admin(ns, &name).await? {
            errors.push(format!(
                "Invalid value {name} for name: Namespace is not owner of the connect cluster."
            ));
        }
        errors.extend(self.validate_creation(ns, &connect_cluster).await?);

        if !errors.is_empty() {
            return Err(GovernanceError::validation(ConnectCluster::KIND, name, errors));
        }

        let existing = self.connect_clusters.find_by_name(ns.cluster(), &name).await?;
        let unchanged = existing.as_ref().is_some_and(|e| e.spec == connect_cluster.spec);
        let outcome = ApplyOutcome::of_apply(existing.is_some(), unchanged);
        connect_cluster.metadata.attribute(ns.name(), ns.cluster());

        if dry_run || !outcome.requires_persistence() {
            return Ok((connect_cluster, outcome));
        }

        debug!(cluster = ns.cluster(), connect_cluster = %name, %outcome, "applying connect cluster");
        let created = self.connect_clusters.create(connect_cluster).await?;
        Ok((created, outcome))
    }

    /// Deletes a declared connect cluster. Refused while connectors are
    /// still deployed on it.
    pub async fn delete(&self, ns: &Namespace, name: &str, dry_run: bool) -> Result<()> {
        if !self.is_owner_or_admin(ns, name).await? {
            return Err(GovernanceError::validation(
                ConnectCluster::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Namespace is not owner of the connect cluster."
                )],
            ));
        }

        let existing = self
            .connect_clusters
            .find_by_name(ns.cluster(), name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(ConnectCluster::KIND, name))?;

        let deployed: Vec<String> = self
            .connectors
            .find_all_for_cluster(ns.cluster())
            .await?
            .into_iter()
            .filter(|connector| connector.spec.connect_cluster == name)
            .map(|connector| connector.metadata.name)
            .collect();
        if !deployed.is_empty() {
            return Err(GovernanceError::validation(
                ConnectCluster::KIND,
                name,
                vec![format!(
                    "Invalid value {name} for name: Connectors are still deployed on this connect cluster: {}.",
                    deployed.join(", ")
                )],
            ));
        }

        if dry_run {
            return Ok(());
        }

        debug!(cluster = ns.cluster(), connect_cluster = name, "deleting connect cluster");
        Ok(self.connect_clusters.delete(&existing).await?)
    }

    /// Vault-capable clusters visible to the namespace: writable and
    /// carrying a non-empty AES key.
    pub async fn list_vaults(&self, ns: &Namespace) -> Result<Vec<ConnectCluster>> {
        Ok(self
            .find_all_by_namespace_write(ns)
            .await?
            .into_iter()
            .filter(ConnectCluster::has_vault_key)
            .collect())
    }

    /// Checks that the namespace may vault against the named cluster.
    /// Vaulting requires allowed-to-use only, not manage.
    pub async fn validate_vault(&self, ns: &Namespace, name: &str) -> Result<Vec<String>> {
        if !self.is_allowed(ns, name).await? {
            return Ok(vec![format!(
                "Invalid value {name} for name: Namespace is not allowed to use this connect cluster."
            )]);
        }

        let Some(cc) = self.connect_clusters.find_by_name(ns.cluster(), name).await? else {
            return Ok(vec![format!(
                "Invalid value {name} for name: Connect cluster doesn't exist."
            )]);
        };
        if !cc.has_vault_key() {
            return Ok(vec![format!(
                "Invalid value {name} for name: Connect cluster has no vault key configured."
            )]);
        }
        Ok(Vec::new())
    }

    /// Encrypts a batch of clear-text passwords against the named cluster's
    /// vault key. Output order matches input order; plaintexts are never
    /// persisted.
    pub async fn vault_passwords(
        &self,
        ns: &Namespace,
        name: &str,
        passwords: &[String],
    ) -> Result<Vec<VaultResponse>> {
        let errors = self.validate_vault(ns, name).await?;
        if !errors.is_empty() {
            return Err(GovernanceError::validation(ConnectCluster::KIND, name, errors));
        }

        let cc = self
            .connect_clusters
            .find_by_name(ns.cluster(), name)
            .await?
            .ok_or_else(|| GovernanceError::not_found(ConnectCluster::KIND, name))?;

        vault::encrypt_passwords(&cc.spec, passwords)
    }

    async fn is_owner_or_admin(&self, ns: &Namespace, name: &str) -> Result<bool> {
        if ns.name() == ADMIN_NAMESPACE {
            return Ok(true);
        }
        self.access.is_owner(ns, ResourceType::ConnectCluster, name).await
    }

    async fn validate_creation(
        &self,
        ns: &Namespace,
        connect_cluster: &ConnectCluster,
    ) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let name = connect_cluster.name();
        let spec = &connect_cluster.spec;

        if self.config.has_connect(ns.cluster(), name) {
            errors.push(format!(
                "Invalid value {name} for name: A connect cluster is already defined globally with this name. Please provide a different name."
            ));
        }

        if Url::parse(&spec.url).is_err() {
            errors.push(format!(
                "Invalid value {} for url: Value must be a valid URL.",
                spec.url
            ));
        } else {
            // Reachability probe, folded into the validation list so a dead
            // worker reads like any other rejected field.
            let connect = self.reconcilers.connector(ns.cluster())?.connect();
            if let Err(e) = connect.test_connection(spec).await {
                errors.push(format!(
                    "Invalid value {} for url: The connect cluster is not healthy ({e}).",
                    spec.url
                ));
            }
        }

        if let Some(key) = spec.aes256_key.as_deref().filter(|k| !k.is_empty()) {
            if key.len() != VAULT_KEY_SIZE {
                errors.push(format!(
                    "Invalid value for aes256Key: Value must be {VAULT_KEY_SIZE} characters long."
                ));
            }
            if spec.aes256_salt.as_deref().unwrap_or_default().is_empty() {
                errors.push(
                    "Invalid value for aes256Salt: Value is required when aes256Key is set."
                        .to_string(),
                );
            }
        }

        Ok(errors)
    }
}
