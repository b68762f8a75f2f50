use crate::metadata::Metadata;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Config key holding the connector implementation class.
pub const CONNECTOR_CLASS_CONFIG: &str = "connector.class";

/// A declared connector, deployed to one connect cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub metadata: Metadata,
    pub spec: ConnectorSpec,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<ConnectorStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    /// Target connect cluster: one of the namespace's declared allow-list
    /// or a self-deployed cluster the namespace can write to.
    pub connect_cluster: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
}

/// Last-observed worker-side state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub state: String,
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: u32,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<String>,
}

impl Connector {
    pub const KIND: &'static str = "Connector";

    pub fn new(metadata: Metadata, spec: ConnectorSpec) -> Self {
        Self {
            metadata,
            spec,
            status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn class(&self) -> Option<&str> {
        self.spec
            .config
            .get(CONNECTOR_CLASS_CONFIG)
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}
