use crate::metadata::Metadata;
use crate::topic::{Topic, TopicSpec};
use serde::{Deserialize, Serialize};

/// Reserved requester name for admin-scoped operations. Admin bypasses
/// ownership checks but never structural validation.
pub const ADMIN_NAMESPACE: &str = "admin";

/// A tenant boundary: owns a principal identity on its backing cluster and
/// a set of declared resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub metadata: Metadata,
    pub spec: NamespaceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    /// The principal identity used for resource attribution on the backing
    /// cluster. Must be unique within the cluster.
    pub principal: String,
    /// Connect clusters this namespace is allowed to target for deployments,
    /// on top of any self-deployed cluster it can write to.
    #[serde(default)]
    pub connect_clusters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub topic_validator: Option<TopicValidator>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub connector_validator: Option<ConnectorValidator>,
}

impl Namespace {
    pub const KIND: &'static str = "Namespace";

    pub fn new(metadata: Metadata, spec: NamespaceSpec) -> Self {
        Self { metadata, spec }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn cluster(&self) -> &str {
        &self.metadata.cluster
    }
}

/// Per-namespace structural constraints on declared topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicValidator {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_partitions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_replication_factor: Option<u16>,
    /// Config keys that every declared topic must carry.
    #[serde(default)]
    pub required_configs: Vec<String>,
}

impl TopicValidator {
    /// Returns one error per violated constraint, in declaration order.
    pub fn validate(&self, topic: &Topic) -> Vec<String> {
        let mut errors = Vec::new();
        let spec: &TopicSpec = &topic.spec;

        if let Some(max) = self.max_partitions {
            if spec.partitions > max {
                errors.push(format!(
                    "Invalid value {} for configuration partitions: Value must be at most {}.",
                    spec.partitions, max
                ));
            }
        }
        if let Some(max) = self.max_replication_factor {
            if spec.replication_factor > max {
                errors.push(format!(
                    "Invalid value {} for configuration replication.factor: Value must be at most {}.",
                    spec.replication_factor, max
                ));
            }
        }
        for key in &self.required_configs {
            if !spec.configs.contains_key(key) {
                errors.push(format!(
                    "Invalid topic configuration: Missing required configuration {key}."
                ));
            }
        }
        errors
    }
}

/// Per-namespace constraints on declared connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorValidator {
    /// When non-empty, only these connector classes may be declared.
    #[serde(default)]
    pub allowed_classes: Vec<String>,
}

impl ConnectorValidator {
    pub fn validate_class(&self, class: &str) -> Vec<String> {
        if !self.allowed_classes.is_empty() && !self.allowed_classes.iter().any(|c| c == class) {
            return vec![format!(
                "Invalid value {class} for spec.config.'connector.class': Class is not allowed for this namespace."
            )];
        }
        Vec::new()
    }
}
