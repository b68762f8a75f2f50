use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A self-deployed connect cluster declared by a namespace, usable as a
/// deployment target and optionally as a vault for sensitive configuration
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectCluster {
    pub metadata: Metadata,
    pub spec: ConnectClusterSpec,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<ConnectClusterStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectClusterSpec {
    /// Connect worker REST endpoint.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
    /// AES-256 key enabling the vault for this cluster. 32 bytes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aes256_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aes256_salt: Option<String>,
    /// Output wrapping for vaulted values; `%s` is replaced by the
    /// ciphertext. Defaults to the bare ciphertext.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aes256_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectClusterStatus {
    Healthy,
    Unreachable,
}

impl ConnectCluster {
    pub const KIND: &'static str = "ConnectCluster";

    pub fn new(metadata: Metadata, spec: ConnectClusterSpec) -> Self {
        Self {
            metadata,
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// A cluster exposes vault capability iff it carries a non-empty key.
    pub fn has_vault_key(&self) -> bool {
        self.spec
            .aes256_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }
}
