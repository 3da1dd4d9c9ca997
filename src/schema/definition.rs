use crate::chain::{InputId, OutputId, id_map};
use crate::error::SchemaConversionError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A node type as described by the node-definition provider.
///
/// Only the identity and the migration history matter to the engine; every other field
/// of the provider's payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    #[serde(rename = "schemaId")]
    pub schema_id: String,
    /// Append-only history of structural changes. Its length is the schema's version.
    #[serde(default)]
    pub migrations: Vec<Migration>,
}

/// A single versioned change to a node type.
///
/// The set of kinds is closed: the applier matches on it exhaustively, so adding a kind
/// fails to compile until it is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Migration {
    /// Nodes stored under `old` are instances of this schema.
    Rename { old: String },
    ChangeInputs(ChangeInputs),
    ChangeOutputs(ChangeOutputs),
    /// Orders this migration after `schema_id` reached `version`, and before its next one.
    NodeDependency {
        #[serde(rename = "schemaId")]
        schema_id: String,
        version: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeInputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<InputId>,
    #[serde(
        default,
        deserialize_with = "id_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub rename: BTreeMap<InputId, InputId>,
    #[serde(
        default,
        deserialize_with = "id_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub add: BTreeMap<InputId, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeOutputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<OutputId>,
    #[serde(
        default,
        deserialize_with = "id_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub rename: BTreeMap<OutputId, OutputId>,
}

impl NodeSchema {
    pub fn new(schema_id: impl Into<String>, migrations: Vec<Migration>) -> Self {
        Self {
            schema_id: schema_id.into(),
            migrations,
        }
    }

    pub fn version(&self) -> usize {
        self.migrations.len()
    }
}

impl Migration {
    pub fn rename(old: impl Into<String>) -> Self {
        Migration::Rename { old: old.into() }
    }

    pub fn node_dependency(schema_id: impl Into<String>, version: usize) -> Self {
        Migration::NodeDependency {
            schema_id: schema_id.into(),
            version,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Migration::Rename { .. } => "rename",
            Migration::ChangeInputs(_) => "change_inputs",
            Migration::ChangeOutputs(_) => "change_outputs",
            Migration::NodeDependency { .. } => "node_dependency",
        }
    }
}

/// The node list as served by the backend, either bare or wrapped in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaDocument {
    List(Vec<NodeSchema>),
    Wrapped { schemata: Vec<NodeSchema> },
}

impl SchemaDocument {
    pub fn from_json(json: &str) -> Result<Self, SchemaConversionError> {
        serde_json::from_str(json).map_err(|e| SchemaConversionError::JsonParseError(e.to_string()))
    }
}

/// A trait for provider formats that can be turned into the engine's `NodeSchema` list.
///
/// Implement this on whatever your node-definition source deserializes into to feed it to
/// `Migrator::builder`.
pub trait IntoSchemas {
    fn into_schemas(self) -> Result<Vec<NodeSchema>, SchemaConversionError>;
}

impl IntoSchemas for Vec<NodeSchema> {
    fn into_schemas(self) -> Result<Vec<NodeSchema>, SchemaConversionError> {
        let mut seen = AHashSet::new();
        for schema in &self {
            if schema.schema_id.trim().is_empty() {
                return Err(SchemaConversionError::ValidationError(
                    "node schema with an empty schemaId".to_string(),
                ));
            }
            if !seen.insert(schema.schema_id.as_str()) {
                return Err(SchemaConversionError::ValidationError(format!(
                    "schemaId '{}' is defined more than once",
                    schema.schema_id
                )));
            }
        }
        Ok(self)
    }
}

impl IntoSchemas for SchemaDocument {
    fn into_schemas(self) -> Result<Vec<NodeSchema>, SchemaConversionError> {
        match self {
            SchemaDocument::List(schemata) | SchemaDocument::Wrapped { schemata } => {
                schemata.into_schemas()
            }
        }
    }
}
