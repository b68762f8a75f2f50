use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Common metadata carried by every declared resource.
///
/// `namespace` is the owning (for access control entries: granting) tenant,
/// `cluster` the backing cluster the resource lives on. Both are stamped by
/// the control plane on creation, never taken from user input as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub labels: BTreeMap<String, String>,
    #[serde(
        rename = "creationTimestamp",
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub creation_timestamp: Option<OffsetDateTime>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            cluster: String::new(),
            labels: BTreeMap::new(),
            creation_timestamp: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Stamps ownership and creation time. Called by the pipeline right
    /// before persistence, after validation has passed.
    pub fn attribute(&mut self, namespace: &str, cluster: &str) {
        self.namespace = namespace.to_string();
        self.cluster = cluster.to_string();
        self.creation_timestamp = Some(OffsetDateTime::now_utc());
    }
}
