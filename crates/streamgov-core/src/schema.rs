use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A declared schema registry subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub metadata: Metadata,
    pub spec: SchemaSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    /// The schema definition itself.
    pub schema: String,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compatibility: Option<Compatibility>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<SchemaReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReference {
    pub name: String,
    pub subject: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    #[default]
    Avro,
    Json,
    Protobuf,
}

/// Registry-side compatibility mode for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compatibility {
    GlobalDefault,
    Backward,
    BackwardTransitive,
    Forward,
    ForwardTransitive,
    Full,
    FullTransitive,
    None,
}

impl Schema {
    pub const KIND: &'static str = "Schema";

    pub fn new(metadata: Metadata, spec: SchemaSpec) -> Self {
        Self { metadata, spec }
    }

    /// Subject name, e.g. `fin.orders-value`.
    pub fn subject(&self) -> &str {
        &self.metadata.name
    }
}
