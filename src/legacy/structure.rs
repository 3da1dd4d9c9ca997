//! Steps that repair the shape of the graph rather than the values of particular nodes.

use super::StepResult;
use crate::chain::{Graph, Position, format_handle};
use crate::ident::{derive_edge_id, derive_unique_id};
use ahash::{AHashMap, AHashSet};
use serde_json::Value;

/// Schema ids of node types whose generated id does not follow the category/name rule.
const KNOWN_LEGACY_NODES: &[(&str, &str, &str)] = &[
    ("Image", "Load Image", "chainner:image:load"),
    ("Image", "Save Image", "chainner:image:save"),
    ("Image", "Preview Image", "chainner:image:view"),
    ("Image", "Read Image", "chainner:image:load"),
    ("PyTorch", "Load Model", "chainner:pytorch:load_model"),
    ("PyTorch", "Upscale Image", "chainner:pytorch:upscale_image"),
    ("Image (Utility)", "Overlay Images", "chainner:image:overlay"),
];

/// Fields old files copied from the node definition into every node.
const EMBEDDED_DEFINITION_FIELDS: &[&str] = &[
    "inputs",
    "outputs",
    "description",
    "icon",
    "subcategory",
    "nodeType",
];

/// Node types renamed before per-node renames were tracked.
const LEGACY_SCHEMA_RENAMES: &[(&str, &str)] = &[
    ("chainner:image:file_iterator", "chainner:image:load_images"),
    ("chainner:image:simple_upscale", "chainner:pytorch:upscale_image"),
    ("chainner:image:image_dim", "chainner:image:get_dims"),
    ("chainner:utility:note", "chainner:utility:comment"),
];

/// Gives pre-versioning nodes, which are identified by category and display name, a schema id.
pub(super) fn assign_schema_ids(mut graph: Graph) -> StepResult {
    for node in &mut graph.nodes {
        if node.data.schema_id.is_empty() {
            let category = node.data.extra.get("category").and_then(Value::as_str);
            let name = node.data.extra.get("type").and_then(Value::as_str);
            if let (Some(category), Some(name)) = (category, name) {
                let schema_id = legacy_schema_id(category, name);
                node.data.schema_id = schema_id;
                node.data.extra.remove("category");
                node.data.extra.remove("type");
            }
        }
        if node.data.id.is_empty() {
            node.data.id = node.id.clone();
        }
    }
    Ok(graph)
}

fn legacy_schema_id(category: &str, name: &str) -> String {
    KNOWN_LEGACY_NODES
        .iter()
        .find(|(c, n, _)| *c == category && *n == name)
        .map(|(_, _, id)| id.to_string())
        .unwrap_or_else(|| format!("chainner:{}:{}", snake_case(category), snake_case(name)))
}

fn snake_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

pub(super) fn strip_embedded_definitions(mut graph: Graph) -> StepResult {
    for node in &mut graph.nodes {
        for field in EMBEDDED_DEFINITION_FIELDS {
            node.data.extra.remove(*field);
        }
    }
    Ok(graph)
}

/// Handles used to be bare slot numbers; they now carry the owning node id.
pub(super) fn qualify_handles(mut graph: Graph) -> StepResult {
    for edge in &mut graph.edges {
        if let Some(slot) = bare_slot(&edge.source_handle) {
            edge.source_handle = format_handle(&edge.source, slot);
        }
        if let Some(slot) = bare_slot(&edge.target_handle) {
            edge.target_handle = format_handle(&edge.target, slot);
        }
    }
    Ok(graph)
}

/// An empty handle meant the first slot.
fn bare_slot(handle: &str) -> Option<u32> {
    if handle.is_empty() {
        Some(0)
    } else {
        handle.parse().ok()
    }
}

pub(super) fn ensure_edge_ids(mut graph: Graph) -> StepResult {
    let mut seen = AHashSet::new();
    for (index, edge) in graph.edges.iter_mut().enumerate() {
        if edge.id.is_empty() || seen.contains(&edge.id) {
            let derived = derive_edge_id(&edge.source_handle, &edge.target_handle);
            edge.id = if seen.contains(&derived) {
                derive_unique_id(&derived, &index.to_string())
            } else {
                derived
            };
        }
        seen.insert(edge.id.clone());
    }
    Ok(graph)
}

pub(super) fn remove_dangling_edges(mut graph: Graph) -> StepResult {
    let node_ids: AHashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let before = graph.edges.len();
    graph
        .edges
        .retain(|e| node_ids.contains(e.source.as_str()) && node_ids.contains(e.target.as_str()));
    if graph.edges.len() != before {
        log::debug!("Removed {} dangling edges", before - graph.edges.len());
    }
    Ok(graph)
}

pub(super) fn rename_legacy_schemas(mut graph: Graph) -> StepResult {
    for node in &mut graph.nodes {
        if let Some((_, new)) = LEGACY_SCHEMA_RENAMES
            .iter()
            .find(|(old, _)| *old == node.data.schema_id)
        {
            node.data.schema_id = new.to_string();
        }
    }
    Ok(graph)
}

/// Iterator sizes moved from node data onto the node itself, and iterator children switched
/// from absolute to parent-relative positions.
pub(super) fn iterator_geometry(mut graph: Graph) -> StepResult {
    let mut resized: AHashMap<String, Position> = AHashMap::new();
    for node in &mut graph.nodes {
        if let Some(size) = node.data.extra.remove("iteratorSize") {
            if let Some(width) = size.get("width").and_then(Value::as_f64) {
                node.width = Some(width);
            }
            if let Some(height) = size.get("height").and_then(Value::as_f64) {
                node.height = Some(height);
            }
            resized.insert(node.id.clone(), node.position);
        }
    }

    for node in &mut graph.nodes {
        if let Some(parent) = node.parent_id.as_ref().and_then(|p| resized.get(p)) {
            node.position.x -= parent.x;
            node.position.y -= parent.y;
        }
    }
    Ok(graph)
}

/// An input accepts a single connection; later duplicates are dropped.
pub(super) fn dedupe_input_edges(mut graph: Graph) -> StepResult {
    let mut connected = AHashSet::new();
    graph
        .edges
        .retain(|e| connected.insert((e.target.clone(), e.target_handle.clone())));
    Ok(graph)
}

pub(super) fn normalize_viewport(mut graph: Graph) -> StepResult {
    let viewport = &mut graph.viewport;
    if !viewport.zoom.is_finite() || viewport.zoom <= 0.0 {
        viewport.zoom = 1.0;
    }
    if !viewport.x.is_finite() {
        viewport.x = 0.0;
    }
    if !viewport.y.is_finite() {
        viewport.y = 0.0;
    }
    Ok(graph)
}
