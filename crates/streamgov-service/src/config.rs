use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Static control-plane configuration: the managed backing clusters and
/// their pre-configured connect workers. Loaded once at startup; every
/// per-cluster registry is built from it and injected, never resolved
/// ambiently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GovConfig {
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    #[serde(default)]
    pub provider: ClusterProvider,
    /// Pre-configured connect workers, keyed by connect-cluster name.
    #[serde(default)]
    pub connects: IndexMap<String, ConnectWorkerConfig>,
}

/// Hosting flavor of a backing cluster. Some providers restrict otherwise
/// legal operations (e.g. cleanup-policy transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterProvider {
    #[default]
    SelfManaged,
    ConfluentCloud,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectWorkerConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
}

impl GovConfig {
    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }

    pub fn has_cluster(&self, name: &str) -> bool {
        self.cluster(name).is_some()
    }

    /// Whether the given connect cluster is pre-configured on the given
    /// backing cluster.
    pub fn has_connect(&self, cluster: &str, connect_cluster: &str) -> bool {
        self.cluster(cluster)
            .is_some_and(|c| c.connects.contains_key(connect_cluster))
    }

    pub fn provider(&self, cluster: &str) -> ClusterProvider {
        self.cluster(cluster)
            .map(|c| c.provider)
            .unwrap_or_default()
    }
}
