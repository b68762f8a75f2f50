use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// Permission granted by an access control entry.
///
/// Only `Owner` entries granted by a namespace to itself establish ownership
/// of matching resource names. `Write` and `Read` extend visibility or
/// mutation rights to other namespaces without conferring ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Owner,
    Write,
    Read,
}

/// The kind of resource an entry grants rights over.
///
/// Closed enumeration, exhaustively matched everywhere: adding a resource
/// type is a compile-time-visible change at every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Topic,
    Connect,
    ConnectCluster,
    Group,
    Schema,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Topic => write!(f, "Topic"),
            Self::Connect => write!(f, "Connector"),
            Self::ConnectCluster => write!(f, "ConnectCluster"),
            Self::Group => write!(f, "Group"),
            Self::Schema => write!(f, "Schema"),
        }
    }
}

/// How an entry's resource pattern matches resource names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatternType {
    /// Exact name match.
    Literal,
    /// Starts-with match.
    Prefixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AceSpec {
    pub resource_type: ResourceType,
    /// The resource name pattern, interpreted under `pattern_type`.
    pub resource: String,
    pub pattern_type: PatternType,
    pub permission: Permission,
    /// The grantee namespace.
    pub granted_to: String,
}

impl AceSpec {
    /// Whether this entry's pattern matches the given resource name.
    pub fn matches(&self, name: &str) -> bool {
        match self.pattern_type {
            PatternType::Literal => self.resource == name,
            PatternType::Prefixed => name.starts_with(&self.resource),
        }
    }

    /// Whether every name matched by `other` is also matched by this
    /// pattern. A literal never covers a prefixed pattern, even for the
    /// same string: the prefix also matches longer names.
    pub fn covers(&self, other: &AceSpec) -> bool {
        if self.resource_type != other.resource_type {
            return false;
        }
        match (self.pattern_type, other.pattern_type) {
            (PatternType::Literal, PatternType::Literal) => self.resource == other.resource,
            (PatternType::Literal, PatternType::Prefixed) => false,
            (PatternType::Prefixed, _) => other.resource.starts_with(&self.resource),
        }
    }

    /// Whether two patterns of the same resource type can both claim a name.
    ///
    /// Used at creation time to keep ownership patterns of distinct
    /// namespaces disjoint.
    pub fn overlaps(&self, other: &AceSpec) -> bool {
        if self.resource_type != other.resource_type {
            return false;
        }
        match (self.pattern_type, other.pattern_type) {
            (PatternType::Literal, PatternType::Literal) => self.resource == other.resource,
            (PatternType::Literal, PatternType::Prefixed) => {
                self.resource.starts_with(&other.resource)
            }
            (PatternType::Prefixed, PatternType::Literal) => {
                other.resource.starts_with(&self.resource)
            }
            (PatternType::Prefixed, PatternType::Prefixed) => {
                self.resource.starts_with(&other.resource)
                    || other.resource.starts_with(&self.resource)
            }
        }
    }
}

/// A directed grant from the declaring (grantor) namespace to a grantee.
///
/// The grantor is the entry's `metadata.namespace`; the identity of an entry
/// is `(grantor, name)`. Entries are created, listed and deleted, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub metadata: Metadata,
    pub spec: AceSpec,
}

impl AccessControlEntry {
    pub const KIND: &'static str = "AccessControlEntry";

    pub fn new(metadata: Metadata, spec: AceSpec) -> Self {
        Self { metadata, spec }
    }

    /// The granting namespace.
    pub fn grantor(&self) -> &str {
        &self.metadata.namespace
    }

    /// Whether this entry is a namespace's grant to itself.
    pub fn is_self_granted(&self) -> bool {
        self.spec.granted_to == self.metadata.namespace
    }

    /// Whether this entry establishes ownership of the given name for the
    /// given namespace: a self-granted OWNER entry of the right type whose
    /// pattern matches.
    pub fn establishes_ownership(&self, namespace: &str, resource_type: ResourceType, name: &str) -> bool {
        self.spec.permission == Permission::Owner
            && self.spec.granted_to == namespace
            && self.metadata.namespace == namespace
            && self.spec.resource_type == resource_type
            && self.spec.matches(name)
    }
}
