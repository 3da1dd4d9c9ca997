//! Common test utilities for building chains, schemas and save files.
use chain_migrate::ident::derive_edge_id;
use chain_migrate::prelude::*;
use chain_migrate::save::content_hash;
use serde_json::{Value, json};

/// Creates a node with the given inputs.
#[allow(dead_code)]
pub fn node(id: &str, schema_id: &str, inputs: &[(InputId, Value)]) -> Node {
    Node::new(id, schema_id, inputs.iter().cloned().collect())
}

/// Creates a node that records an explicit schema version.
#[allow(dead_code)]
pub fn versioned_node(
    id: &str,
    schema_id: &str,
    version: usize,
    inputs: &[(InputId, Value)],
) -> Node {
    let mut node = node(id, schema_id, inputs);
    node.data.schema_version = Some(version);
    node
}

/// Connects output `output` of `source` to input `input` of `target`.
#[allow(dead_code)]
pub fn edge(source: &str, output: OutputId, target: &str, input: InputId) -> Edge {
    let source_handle = format!("{}-{}", source, output);
    let target_handle = format!("{}-{}", target, input);
    Edge::new(
        derive_edge_id(&source_handle, &target_handle),
        source,
        output,
        target,
        input,
    )
}

#[allow(dead_code)]
pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> Graph {
    Graph {
        nodes,
        edges,
        viewport: Viewport::default(),
    }
}

/// `new:a` was called `old:a` and later gained input 5.
///
/// Logic: `old:a` (v0) -> rename -> `new:a` (v1) -> add input 5 = true -> (v2)
#[allow(dead_code)]
pub fn create_rename_schemas() -> Vec<NodeSchema> {
    vec![NodeSchema::new(
        "new:a",
        vec![
            Migration::rename("old:a"),
            Migration::ChangeInputs(ChangeInputs {
                add: [(5, json!(true))].into_iter().collect(),
                ..Default::default()
            }),
        ],
    )]
}

/// A small image pipeline's node types with a few releases of history each.
#[allow(dead_code)]
pub fn create_image_schemas() -> Vec<NodeSchema> {
    vec![
        NodeSchema::new("chainner:image:load", vec![]),
        NodeSchema::new(
            "chainner:image:resize",
            vec![
                Migration::rename("chainner:image:resize_factor"),
                // Swap width and height slots.
                Migration::ChangeInputs(ChangeInputs {
                    rename: [(1, 2), (2, 1)].into_iter().collect(),
                    ..Default::default()
                }),
                Migration::ChangeInputs(ChangeInputs {
                    remove: vec![3],
                    add: [(4, json!("auto"))].into_iter().collect(),
                    ..Default::default()
                }),
            ],
        ),
        NodeSchema::new(
            "chainner:image:split_channels",
            vec![Migration::ChangeOutputs(ChangeOutputs {
                remove: vec![3],
                rename: [(0, 2), (2, 0)].into_iter().collect(),
            })],
        ),
        NodeSchema::new(
            "chainner:image:save",
            vec![Migration::node_dependency("chainner:image:resize", 2)],
        ),
    ]
}

/// A typical chain: load -> resize -> save, plus a channel splitter feeding save.
#[allow(dead_code)]
pub fn create_image_chain() -> Graph {
    graph(
        vec![
            node("load", "chainner:image:load", &[(0, json!("C:/in.png"))]),
            node(
                "resize",
                "chainner:image:resize_factor",
                &[(1, json!(640)), (2, json!(480)), (3, json!(1))],
            ),
            node("split", "chainner:image:split_channels", &[]),
            node("save", "chainner:image:save", &[(1, json!("C:/out"))]),
        ],
        vec![
            edge("load", 0, "resize", 0),
            edge("load", 0, "split", 0),
            edge("resize", 0, "save", 0),
            edge("split", 0, "resize", 1),
            edge("split", 3, "resize", 3),
        ],
    )
}

/// Wraps content in a versioned save file envelope.
#[allow(dead_code)]
pub fn versioned_file(
    content: &Value,
    version: &str,
    checksum: Option<&str>,
    migration: Option<u32>,
) -> String {
    let mut file = json!({ "version": version, "content": content });
    if let Some(checksum) = checksum {
        file["checksum"] = json!(checksum);
    }
    if let Some(migration) = migration {
        file["migration"] = json!(migration);
    }
    file.to_string()
}

/// Wraps content in a save file with a correct checksum and an up-to-date counter.
#[allow(dead_code)]
pub fn checked_file(content: &Graph, version: &str) -> String {
    let value = serde_json::to_value(content).expect("graph serializes");
    let checksum = content_hash(&value);
    versioned_file(
        &value,
        version,
        Some(&checksum),
        Some(LEGACY_MIGRATION_COUNT as u32),
    )
}
