use crate::metadata::Metadata;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const CLEANUP_POLICY_CONFIG: &str = "cleanup.policy";
pub const CLEANUP_POLICY_DELETE: &str = "delete";
pub const CLEANUP_POLICY_COMPACT: &str = "compact";

/// A declared topic on a backing cluster.
///
/// Ownership is derived from access control entries, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub metadata: Metadata,
    pub spec: TopicSpec,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<TopicStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    pub partitions: u32,
    pub replication_factor: u16,
    /// Broker-side topic configuration, declaration order preserved.
    #[serde(default)]
    pub configs: IndexMap<String, String>,
}

/// Last-observed live state, refreshed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStatus {
    pub phase: TopicPhase,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicPhase {
    Pending,
    Success,
    Failed,
}

impl Topic {
    pub const KIND: &'static str = "Topic";

    pub fn new(metadata: Metadata, spec: TopicSpec) -> Self {
        Self {
            metadata,
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn cleanup_policy(&self) -> Option<&str> {
        self.spec.configs.get(CLEANUP_POLICY_CONFIG).map(String::as_str)
    }

    /// Compacted topics are not eligible for record deletion.
    pub fn is_compacted(&self) -> bool {
        self.cleanup_policy() == Some(CLEANUP_POLICY_COMPACT)
    }

    /// Whether two topic names are ambiguous on the backing platform, which
    /// treats `.` and `_` as the same character in internal metric names.
    pub fn collides_with(name: &str, other: &str) -> bool {
        name.replace('.', "_") == other.replace('.', "_")
    }
}
