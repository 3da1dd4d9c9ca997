//! Steps that fix the stored values or layout of specific node types.

use super::StepResult;
use crate::chain::{Edge, Graph, InputData, InputId, Node, Position, format_handle};
use crate::error::MigrationError;
use crate::ident::{derive_edge_id, derive_unique_id};
use ahash::AHashSet;
use serde_json::{Value, json};

const OPACITY: &str = "chainner:image:opacity";
const GAUSSIAN_BLUR: &str = "chainner:image:gaussian_blur";
const ROTATE_FLIP: &str = "chainner:image:rotate_flip";
const ROTATE: &str = "chainner:image:rotate";
const FLIP: &str = "chainner:image:flip";
const SAVE_IMAGE: &str = "chainner:image:save";
const LOAD_IMAGE: &str = "chainner:image:load";
const COLOR: &str = "chainner:utility:color";
const TEXT: &str = "chainner:utility:text";

/// Horizontal distance between the two halves of a split node.
const SPLIT_OFFSET: f64 = 300.0;

fn nodes_of<'a>(graph: &'a mut Graph, schema_id: &'a str) -> impl Iterator<Item = &'a mut Node> {
    graph
        .nodes
        .iter_mut()
        .filter(move |n| n.data.schema_id == schema_id)
}

fn scale_number(node: &mut Node, input: InputId, factor: f64) {
    if let Some(value) = node.data.input_data.get_mut(&input) {
        if let Some(number) = value.as_f64() {
            *value = json!(number * factor);
        }
    }
}

/// Opacity was stored as a fraction and is now a percentage.
pub(super) fn opacity_to_percent(mut graph: Graph) -> StepResult {
    for node in nodes_of(&mut graph, OPACITY) {
        scale_number(node, 1, 100.0);
    }
    Ok(graph)
}

/// Gaussian blur takes a radius per axis instead of a standard deviation.
pub(super) fn blur_sigma_to_radius(mut graph: Graph) -> StepResult {
    for node in nodes_of(&mut graph, GAUSSIAN_BLUR) {
        scale_number(node, 1, 3.0);
        scale_number(node, 2, 3.0);
    }
    Ok(graph)
}

/// The combined rotate-and-flip node became a rotate node followed by a flip node.
///
/// Inputs: 0 image, 1 rotation, 2 flip mode. The flip mode moves to input 1 of the new
/// flip node, whose id is derived from the original node so repeated loads agree.
pub(super) fn split_rotate_flip(graph: Graph) -> StepResult {
    let Graph {
        nodes,
        mut edges,
        viewport,
    } = graph;

    let mut migrated = Vec::with_capacity(nodes.len());
    let mut links = Vec::new();
    for mut node in nodes {
        if node.data.schema_id != ROTATE_FLIP {
            migrated.push(node);
            continue;
        }

        let flip_id = derive_unique_id(&node.id, "flip");
        let mut flip_inputs = InputData::new();
        if let Some(mode) = node.data.input_data.remove(&2) {
            flip_inputs.insert(1, mode);
        }
        let mut flip = Node::new(flip_id.clone(), FLIP, flip_inputs);
        flip.position = Position {
            x: node.position.x + SPLIT_OFFSET,
            y: node.position.y,
        };
        flip.parent_id = node.parent_id.clone();
        node.data.schema_id = ROTATE.to_string();

        for edge in edges.iter_mut() {
            if edge.source == node.id {
                let slot = edge.output_slot().unwrap_or(0);
                edge.source = flip_id.clone();
                edge.source_handle = format_handle(&flip_id, slot);
            } else if edge.target == node.id && edge.input_slot() == Some(2) {
                edge.target = flip_id.clone();
                edge.target_handle = format_handle(&flip_id, 1);
            }
        }

        let link_id = derive_edge_id(&format_handle(&node.id, 0), &format_handle(&flip_id, 0));
        links.push(Edge::new(link_id, &node.id, 0, &flip_id, 0));
        migrated.push(node);
        migrated.push(flip);
    }
    edges.extend(links);

    Ok(Graph {
        nodes: migrated,
        edges,
        viewport,
    })
}

/// Save Image lost its separate quality toggle (input 5).
pub(super) fn drop_save_image_quality_flag(mut graph: Graph) -> StepResult {
    let mut affected = AHashSet::new();
    for node in nodes_of(&mut graph, SAVE_IMAGE) {
        node.data.input_data.remove(&5);
        affected.insert(node.id.clone());
    }
    graph
        .edges
        .retain(|e| !(affected.contains(&e.target) && e.input_slot() == Some(5)));
    Ok(graph)
}

/// Load Image gained an "ignore alpha" toggle that defaults to off.
pub(super) fn add_load_image_defaults(mut graph: Graph) -> StepResult {
    for node in nodes_of(&mut graph, LOAD_IMAGE) {
        node.data
            .input_data
            .entry(1)
            .or_insert(Value::Bool(false));
    }
    Ok(graph)
}

/// Colors were stored as `#rrggbb` strings and are now structured RGB values in `0..=1`.
pub(super) fn color_hex_to_struct(mut graph: Graph) -> StepResult {
    for node in nodes_of(&mut graph, COLOR) {
        let Some(Value::String(hex)) = node.data.input_data.get(&0) else {
            continue;
        };
        let [r, g, b] = parse_hex_color(hex).ok_or_else(|| MigrationError::LegacyStep {
            step: "color_hex_to_struct",
            message: format!("node '{}' has an invalid color '{}'", node.id, hex),
        })?;
        node.data
            .input_data
            .insert(0, json!({ "kind": "rgb", "values": [r, g, b] }));
    }
    Ok(graph)
}

fn parse_hex_color(hex: &str) -> Option<[f64; 3]> {
    let digits = hex.trim().strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| -> Option<f64> {
        let byte = u8::from_str_radix(expanded.get(i * 2..i * 2 + 2)?, 16).ok()?;
        Some(f64::from(byte) / 255.0)
    };
    Some([channel(0)?, channel(1)?, channel(2)?])
}

/// Text inputs no longer accept `null`.
pub(super) fn empty_text_inputs(mut graph: Graph) -> StepResult {
    for node in nodes_of(&mut graph, TEXT) {
        let value = node.data.input_data.entry(0).or_insert(Value::Null);
        if value.is_null() {
            *value = Value::String(String::new());
        }
    }
    Ok(graph)
}
