use super::definition::{ChangeInputs, ChangeOutputs, Migration};
use super::registry::SchemaMigrations;
use crate::chain::{Edge, Node, format_handle};

/// Applies migration `index` of `schema` to a single node and the edges touching it.
pub(crate) fn apply_migration(
    node: &mut Node,
    edges: &mut Vec<Edge>,
    schema: &SchemaMigrations,
    index: usize,
) {
    let Some(migration) = schema.migrations.get(index) else {
        return;
    };

    match migration {
        Migration::Rename { .. } => {
            let renamed = schema.name_after(index);
            if node.data.schema_id != renamed {
                log::debug!(
                    "Renaming node '{}' from '{}' to '{}'",
                    node.id,
                    node.data.schema_id,
                    renamed
                );
                node.data.schema_id = renamed.to_string();
            }
        }
        Migration::ChangeInputs(change) => change_inputs(node, edges, change),
        Migration::ChangeOutputs(change) => change_outputs(node, edges, change),
        Migration::NodeDependency { .. } => {}
    }
}

fn change_inputs(node: &mut Node, edges: &mut Vec<Edge>, change: &ChangeInputs) {
    let inputs = &mut node.data.input_data;

    for id in &change.remove {
        inputs.remove(id);
    }
    if !change.remove.is_empty() {
        edges.retain(|e| {
            e.target != node.id || !e.input_slot().is_some_and(|slot| change.remove.contains(&slot))
        });
    }

    // Take every renamed value out first so that swaps and rotations do not clobber each other.
    let moved: Vec<_> = change
        .rename
        .iter()
        .map(|(old, new)| (*new, inputs.remove(old)))
        .collect();
    for (new, value) in moved {
        if let Some(value) = value {
            inputs.insert(new, value);
        }
    }
    if !change.rename.is_empty() {
        for edge in edges.iter_mut().filter(|e| e.target == node.id) {
            if let Some(new) = edge.input_slot().and_then(|slot| change.rename.get(&slot)) {
                edge.target_handle = format_handle(&node.id, *new);
            }
        }
    }

    for (id, default) in &change.add {
        inputs.entry(*id).or_insert_with(|| default.clone());
    }
}

fn change_outputs(node: &Node, edges: &mut Vec<Edge>, change: &ChangeOutputs) {
    if !change.remove.is_empty() {
        edges.retain(|e| {
            e.source != node.id
                || !e.output_slot().is_some_and(|slot| change.remove.contains(&slot))
        });
    }
    if !change.rename.is_empty() {
        for edge in edges.iter_mut().filter(|e| e.source == node.id) {
            if let Some(new) = edge.output_slot().and_then(|slot| change.rename.get(&slot)) {
                edge.source_handle = format_handle(&node.id, *new);
            }
        }
    }
}
