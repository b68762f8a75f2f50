use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use streamgov_access::AccessControlService;
use streamgov_core::{
    ADMIN_NAMESPACE, ApplyOutcome, Compatibility, GovernanceError, Namespace, ResourceType,
    Result, Schema,
};
use streamgov_storage::{RegisteredSchema, SchemaRegistryClient};

/// Schema governance. The registry itself is the store of record: there is
/// no declared-state copy, every operation goes straight to the registry of
/// the namespace's cluster.
pub struct SchemaService {
    registries: HashMap<String, Arc<dyn SchemaRegistryClient>>,
    access: Arc<AccessControlService>,
}

impl SchemaService {
    pub fn new(
        registries: HashMap<String, Arc<dyn SchemaRegistryClient>>,
        access: Arc<AccessControlService>,
    ) -> Self {
        Self { registries, access }
    }

    /// Subjects owned by the namespace. A subject is owned either directly
    /// (SCHEMA grant) or through the underlying topic, with the registry's
    /// `-key`/`-value` suffix stripped.
    pub async fn find_all_for_namespace(&self, ns: &Namespace) -> Result<Vec<String>> {
        let registry = self.registry(ns.cluster())?;
        let subjects = registry.list_subjects().await?;
        let grants = self.access.grants_received_by(ns).await?;

        Ok(subjects
            .into_iter()
            .filter(|subject| Self::owns_subject(&grants, ns, subject))
            .collect())
    }

    pub async fn get_latest(&self, ns: &Namespace, subject: &str) -> Result<Option<RegisteredSchema>> {
        self.check_ownership(ns, subject).await?;
        Ok(self.registry(ns.cluster())?.get_latest(subject).await?)
    }

    /// Registers a schema under an owned subject after checking it against
    /// the latest registered version. Incompatibilities reject the mutation
    /// with the registry's own messages.
    pub async fn apply(
        &self,
        ns: &Namespace,
        schema: Schema,
        dry_run: bool,
    ) -> Result<(Schema, ApplyOutcome)> {
        let subject = schema.subject().to_string();
        self.check_ownership(ns, &subject).await?;

        let registry = self.registry(ns.cluster())?;
        let latest = registry.get_latest(&subject).await?;

        if latest.is_some() {
            let incompatibilities = match registry.check_compatibility(&subject, &schema.spec).await {
                Ok(messages) => messages,
                // Fail closed: an unanswerable compatibility question is a
                // rejection, not a silent pass.
                Err(e) => vec![format!("Invalid schema: Compatibility check failed ({e}).")],
            };
            if !incompatibilities.is_empty() {
                return Err(GovernanceError::validation(
                    Schema::KIND,
                    subject,
                    incompatibilities,
                ));
            }
        }

        let unchanged = latest.as_ref().is_some_and(|l| l.schema == schema.spec.schema);
        let outcome = ApplyOutcome::of_apply(latest.is_some(), unchanged);

        if dry_run || !outcome.requires_persistence() {
            return Ok((schema, outcome));
        }

        let id = registry.register(&subject, &schema.spec).await?;
        debug!(cluster = ns.cluster(), subject = %subject, id, %outcome, "registered schema");
        Ok((schema, outcome))
    }

    /// Deletes a subject, soft by default. Returns the deleted versions.
    pub async fn delete_subject(
        &self,
        ns: &Namespace,
        subject: &str,
        permanent: bool,
        dry_run: bool,
    ) -> Result<Vec<u32>> {
        self.check_ownership(ns, subject).await?;

        let registry = self.registry(ns.cluster())?;
        if registry.get_latest(subject).await?.is_none() {
            return Err(GovernanceError::not_found(Schema::KIND, subject));
        }

        if dry_run {
            return Ok(Vec::new());
        }

        let versions = registry.delete_subject(subject, permanent).await?;
        info!(cluster = ns.cluster(), subject, permanent, ?versions, "deleted subject");
        Ok(versions)
    }

    pub async fn get_compatibility(&self, ns: &Namespace, subject: &str) -> Result<Compatibility> {
        self.check_ownership(ns, subject).await?;
        Ok(self.registry(ns.cluster())?.get_compatibility(subject).await?)
    }

    pub async fn update_compatibility(
        &self,
        ns: &Namespace,
        subject: &str,
        compatibility: Compatibility,
    ) -> Result<()> {
        self.check_ownership(ns, subject).await?;
        Ok(self
            .registry(ns.cluster())?
            .set_compatibility(subject, compatibility)
            .await?)
    }

    fn registry(&self, cluster: &str) -> Result<&Arc<dyn SchemaRegistryClient>> {
        self.registries.get(cluster).ok_or_else(|| {
            GovernanceError::upstream(format!("No schema registry configured for cluster {cluster}"))
        })
    }

    fn owns_subject(
        grants: &[streamgov_core::AccessControlEntry],
        ns: &Namespace,
        subject: &str,
    ) -> bool {
        let topic = subject
            .strip_suffix("-key")
            .or_else(|| subject.strip_suffix("-value"))
            .unwrap_or(subject);
        grants.iter().any(|ace| {
            ace.establishes_ownership(ns.name(), ResourceType::Schema, subject)
                || ace.establishes_ownership(ns.name(), ResourceType::Topic, topic)
        })
    }

    async fn check_ownership(&self, ns: &Namespace, subject: &str) -> Result<()> {
        if ns.name() == ADMIN_NAMESPACE {
            return Ok(());
        }
        let grants = self.access.grants_received_by(ns).await?;
        if Self::owns_subject(&grants, ns, subject) {
            return Ok(());
        }
        Err(GovernanceError::validation(
            Schema::KIND,
            subject,
            vec![format!(
                "Invalid value {subject} for name: Namespace is not owner of the subject."
            )],
        ))
    }
}
