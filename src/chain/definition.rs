use super::serde_ids::{input_data, lenient_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Identifies an input slot of a node type. Stable within one schema version.
pub type InputId = u32;
/// Identifies an output slot of a node type. Stable within one schema version.
pub type OutputId = u32;

/// The stored values of a node's inputs, keyed by slot.
pub type InputData = BTreeMap<InputId, Value>;

/// The complete, canonical content of a save file: the node graph of a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
}

/// A single node of the chain as stored by the editor.
///
/// Fields the engine does not interpret are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub data: NodeData,
    #[serde(default)]
    pub position: Position,
    #[serde(rename = "parentNode", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The typed payload of a node: which schema it instantiates and what its inputs hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "schemaId", default)]
    pub schema_id: String,
    #[serde(rename = "inputData", default, deserialize_with = "input_data")]
    pub input_data: InputData,
    /// Number of per-node migrations already applied. Absent in files written before
    /// node versions were tracked; the registry infers a value for those.
    #[serde(
        rename = "schemaVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_version: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A connection from one node's output to another node's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default, deserialize_with = "lenient_string")]
    pub source_handle: String,
    #[serde(rename = "targetHandle", default, deserialize_with = "lenient_string")]
    pub target_handle: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: default_zoom(),
        }
    }
}

impl Node {
    /// Creates a regular node with the given id, schema and inputs.
    pub fn new(id: impl Into<String>, schema_id: impl Into<String>, input_data: InputData) -> Self {
        let id = id.into();
        let mut extra = Map::new();
        extra.insert("type".to_string(), Value::String("regularNode".to_string()));
        Self {
            data: NodeData {
                id: id.clone(),
                schema_id: schema_id.into(),
                input_data,
                schema_version: None,
                extra: Map::new(),
            },
            id,
            position: Position::default(),
            parent_id: None,
            width: None,
            height: None,
            extra,
        }
    }

    pub fn schema_id(&self) -> &str {
        &self.data.schema_id
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }
}

impl Edge {
    /// Creates a main edge between two node slots, deriving the handles from the node ids.
    pub fn new(
        id: impl Into<String>,
        source: &str,
        output: OutputId,
        target: &str,
        input: InputId,
    ) -> Self {
        let mut extra = Map::new();
        extra.insert("type".to_string(), Value::String("main".to_string()));
        Self {
            id: id.into(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: super::handle::format_handle(source, output),
            target_handle: super::handle::format_handle(target, input),
            extra,
        }
    }
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Edges ending at the given node.
    pub fn inbound_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Edges starting at the given node.
    pub fn outbound_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }
}
