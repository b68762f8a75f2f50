use std::sync::Arc;
use tracing::debug;

use streamgov_core::{
    AccessControlEntry, ApplyOutcome, GovernanceError, Namespace, Permission, ResourceType, Result,
};
use streamgov_storage::{AccessControlRepository, NamespaceRepository};

/// Listing filter for a namespace's grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclScope {
    /// Grantor or grantee, deduplicated.
    #[default]
    All,
    /// Entries this namespace granted to others. Self-grants excluded.
    GrantedByMe,
    /// Entries granted to this namespace, whoever the grantor.
    GrantedToMe,
}

/// Resolution engine over the access control entries of a cluster.
///
/// Queries never fail on absence: an unknown namespace simply sees no
/// grants. Ownership checks are pure and side-effect-free.
pub struct AccessControlService {
    entries: Arc<dyn AccessControlRepository>,
    namespaces: Arc<dyn NamespaceRepository>,
}

impl AccessControlService {
    pub fn new(
        entries: Arc<dyn AccessControlRepository>,
        namespaces: Arc<dyn NamespaceRepository>,
    ) -> Self {
        Self {
            entries,
            namespaces,
        }
    }

    /// All entries where the namespace is grantor or grantee, restricted to
    /// the namespace's cluster.
    pub async fn grants_visible_to(&self, ns: &Namespace) -> Result<Vec<AccessControlEntry>> {
        let all = self.entries.find_all_for_cluster(ns.cluster()).await?;
        Ok(all
            .into_iter()
            .filter(|ace| ace.grantor() == ns.name() || ace.spec.granted_to == ns.name())
            .collect())
    }

    /// Entries granted to the namespace. These drive listing and
    /// reconciliation visibility, not creation rights.
    pub async fn grants_received_by(&self, ns: &Namespace) -> Result<Vec<AccessControlEntry>> {
        let all = self.entries.find_all_for_cluster(ns.cluster()).await?;
        Ok(all
            .into_iter()
            .filter(|ace| ace.spec.granted_to == ns.name())
            .collect())
    }

    /// Whether the namespace owns the given resource name: a self-granted
    /// OWNER entry of the right type whose pattern matches.
    pub async fn is_owner(
        &self,
        ns: &Namespace,
        resource_type: ResourceType,
        name: &str,
    ) -> Result<bool> {
        let all = self.entries.find_all_for_cluster(ns.cluster()).await?;
        Ok(all
            .iter()
            .any(|ace| ace.establishes_ownership(ns.name(), resource_type, name)))
    }

    /// Scoped listing with a deterministic order per scope, so output is
    /// stable without pagination.
    pub async fn list(&self, ns: &Namespace, scope: AclScope) -> Result<Vec<AccessControlEntry>> {
        let all = self.entries.find_all_for_cluster(ns.cluster()).await?;
        let me = ns.name();

        let mut selected: Vec<AccessControlEntry> = match scope {
            AclScope::GrantedToMe => all
                .into_iter()
                .filter(|ace| ace.spec.granted_to == me)
                .collect(),
            AclScope::GrantedByMe => all
                .into_iter()
                .filter(|ace| ace.grantor() == me && !ace.is_self_granted())
                .collect(),
            AclScope::All => all
                .into_iter()
                .filter(|ace| ace.grantor() == me || ace.spec.granted_to == me)
                .collect(),
        };

        // Granted-by-me sorts by grantee, the other scopes by grantor; ties
        // keep a stable entry-name order.
        match scope {
            AclScope::GrantedByMe => selected.sort_by(|a, b| {
                (&a.spec.granted_to, &a.metadata.name).cmp(&(&b.spec.granted_to, &b.metadata.name))
            }),
            _ => selected.sort_by(|a, b| {
                (a.grantor(), &a.metadata.name).cmp(&(b.grantor(), &b.metadata.name))
            }),
        }
        // An entry can match as both grantor and grantee; keep it once.
        selected.dedup_by(|a, b| a.grantor() == b.grantor() && a.metadata.name == b.metadata.name);
        Ok(selected)
    }

    pub async fn find_by_name(
        &self,
        grantor: &str,
        name: &str,
    ) -> Result<Option<AccessControlEntry>> {
        Ok(self.entries.find_by_name(grantor, name).await?)
    }

    /// Validation for a namespace-issued grant: a namespace may only
    /// delegate rights over patterns it already owns itself, and only to
    /// another existing namespace of its cluster.
    pub async fn validate(
        &self,
        entry: &AccessControlEntry,
        grantor: &Namespace,
    ) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let grantee = &entry.spec.granted_to;

        if grantee == grantor.name() {
            errors.push(format!(
                "Invalid value {grantee} for grantedTo: Self-granted entries are reserved to admin."
            ));
        } else {
            match self.namespaces.find_by_name(grantee).await? {
                Some(ns) if ns.cluster() == grantor.cluster() => {}
                Some(_) => errors.push(format!(
                    "Invalid value {grantee} for grantedTo: Namespace is not on cluster {}.",
                    grantor.cluster()
                )),
                None => errors.push(format!(
                    "Invalid value {grantee} for grantedTo: Namespace doesn't exist."
                )),
            }
        }

        // The delegated pattern must be covered by an owned pattern of at
        // least equal breadth, so a literal owner cannot hand out a prefixed
        // grant reaching names it does not own.
        let all = self.entries.find_all_for_cluster(grantor.cluster()).await?;
        let owns_pattern = all.iter().any(|ace| {
            ace.spec.permission == Permission::Owner
                && ace.is_self_granted()
                && ace.grantor() == grantor.name()
                && ace.spec.covers(&entry.spec)
        });
        if !owns_pattern {
            errors.push(format!(
                "Invalid value {} for resource: Namespace is not owner of the resource.",
                entry.spec.resource
            ));
        }

        Ok(errors)
    }

    /// Admin validation: ownership is bypassed, but a new OWNER grant must
    /// not overlap another namespace's OWNER pattern of the same type.
    /// Keeping ownership prefixes disjoint at creation time is what makes
    /// `is_owner` unambiguous at query time.
    pub async fn validate_as_admin(&self, entry: &AccessControlEntry) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let grantee = &entry.spec.granted_to;

        let grantee_ns = match self.namespaces.find_by_name(grantee).await? {
            Some(ns) => Some(ns),
            None => {
                errors.push(format!(
                    "Invalid value {grantee} for grantedTo: Namespace doesn't exist."
                ));
                None
            }
        };

        if entry.spec.permission == Permission::Owner {
            if let Some(ns) = &grantee_ns {
                let all = self.entries.find_all_for_cluster(ns.cluster()).await?;
                for existing in all {
                    if existing.spec.permission == Permission::Owner
                        && existing.spec.granted_to != *grantee
                        && existing.spec.overlaps(&entry.spec)
                    {
                        errors.push(format!(
                            "Invalid value {} for resource: Pattern overlaps with {} owned by namespace {}.",
                            entry.spec.resource, existing.spec.resource, existing.spec.granted_to
                        ));
                    }
                }
            }
        }

        Ok(errors)
    }

    /// Creates a grant on behalf of a namespace. All-or-nothing: any
    /// validation error rejects the mutation as a unit.
    pub async fn apply(
        &self,
        grantor: &Namespace,
        mut entry: AccessControlEntry,
        dry_run: bool,
    ) -> Result<(AccessControlEntry, ApplyOutcome)> {
        let errors = self.validate(&entry, grantor).await?;
        if !errors.is_empty() {
            return Err(GovernanceError::validation(
                AccessControlEntry::KIND,
                entry.metadata.name,
                errors,
            ));
        }

        entry.metadata.attribute(grantor.name(), grantor.cluster());
        self.persist(entry, dry_run).await
    }

    /// Admin-scoped creation. The grant is attributed to the grantee, so a
    /// granted OWNER entry is self-granted and establishes ownership.
    pub async fn apply_as_admin(
        &self,
        mut entry: AccessControlEntry,
        dry_run: bool,
    ) -> Result<(AccessControlEntry, ApplyOutcome)> {
        let errors = self.validate_as_admin(&entry).await?;
        if !errors.is_empty() {
            return Err(GovernanceError::validation(
                AccessControlEntry::KIND,
                entry.metadata.name,
                errors,
            ));
        }

        let grantee = entry.spec.granted_to.clone();
        let cluster = match self.namespaces.find_by_name(&grantee).await? {
            Some(ns) => ns.cluster().to_string(),
            None => entry.metadata.cluster.clone(),
        };
        entry.metadata.attribute(&grantee, &cluster);
        self.persist(entry, dry_run).await
    }

    async fn persist(
        &self,
        entry: AccessControlEntry,
        dry_run: bool,
    ) -> Result<(AccessControlEntry, ApplyOutcome)> {
        let existing = self
            .entries
            .find_by_name(entry.grantor(), &entry.metadata.name)
            .await?;
        let unchanged = existing.as_ref().is_some_and(|e| e.spec == entry.spec);
        let outcome = ApplyOutcome::of_apply(existing.is_some(), unchanged);

        if dry_run || !outcome.requires_persistence() {
            return Ok((entry, outcome));
        }

        debug!(grantor = entry.grantor(), name = %entry.metadata.name, %outcome, "applying access control entry");
        let created = self.entries.create(entry).await?;
        Ok((created, outcome))
    }

    /// Deletes a grant after re-confirming it exists under the requesting
    /// grantor. Absence is a validation error, matching the creation path.
    pub async fn delete(&self, grantor: &Namespace, name: &str, dry_run: bool) -> Result<()> {
        let existing = self
            .entries
            .find_by_name(grantor.name(), name)
            .await?
            .ok_or_else(|| {
                GovernanceError::validation(
                    AccessControlEntry::KIND,
                    name,
                    vec![format!(
                        "Invalid value {name} for name: Entry doesn't exist in this namespace."
                    )],
                )
            })?;

        if dry_run {
            return Ok(());
        }

        debug!(grantor = grantor.name(), name, "deleting access control entry");
        Ok(self.entries.delete(&existing).await?)
    }
}
