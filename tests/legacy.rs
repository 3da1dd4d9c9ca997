//! Tests for the legacy whole-graph migration sequence.
mod common;
use chain_migrate::ident::{derive_edge_id, derive_unique_id};
use chain_migrate::legacy::{self, LEGACY_MIGRATIONS, LegacyStep, StepResult};
use chain_migrate::prelude::*;
use common::*;
use serde_json::{Value, json};
use std::collections::HashSet;

fn step(name: &str) -> LegacyStep {
    LEGACY_MIGRATIONS
        .iter()
        .find(|s| s.name == name)
        .copied()
        .unwrap_or_else(|| panic!("No legacy step named '{}'", name))
}

fn apply(name: &str, graph: Graph) -> Graph {
    (step(name).apply)(graph).expect("Legacy step failed")
}

fn from_json(value: Value) -> Graph {
    serde_json::from_value(value).expect("Failed to deserialize graph")
}

fn bump_viewport(mut graph: Graph) -> StepResult {
    graph.viewport.x += 1.0;
    Ok(graph)
}

#[test]
fn test_step_names_are_unique() {
    let names: HashSet<&str> = LEGACY_MIGRATIONS.iter().map(|s| s.name).collect();
    assert_eq!(names.len(), LEGACY_MIGRATIONS.len());
    assert_eq!(LEGACY_MIGRATION_COUNT, 16);
    assert_eq!(LEGACY_MIGRATIONS[0].name, "assign_schema_ids");
    assert_eq!(LEGACY_MIGRATIONS[15].name, "normalize_viewport");
}

#[test]
fn test_counter_skips_steps_already_applied() {
    let steps = [
        LegacyStep { name: "one", apply: bump_viewport },
        LegacyStep { name: "two", apply: bump_viewport },
        LegacyStep { name: "three", apply: bump_viewport },
    ];

    let (graph, ran) = legacy::run_steps(&steps, Graph::default(), None).unwrap();
    assert_eq!(ran, 3);
    assert_eq!(graph.viewport.x, 3.0);

    let (graph, ran) = legacy::run_steps(&steps, Graph::default(), Some(1)).unwrap();
    assert_eq!(ran, 2);
    assert_eq!(graph.viewport.x, 2.0);

    let (graph, ran) = legacy::run_steps(&steps, Graph::default(), Some(3)).unwrap();
    assert_eq!(ran, 0);
    assert_eq!(graph.viewport.x, 0.0);
}

#[test]
fn test_counter_beyond_known_steps_runs_nothing() {
    let chain = graph(vec![node("a", "chainner:utility:text", &[])], vec![]);
    let (migrated, ran) = legacy::run(chain.clone(), Some(100)).unwrap();
    assert_eq!(ran, 0);
    assert_eq!(migrated, chain);
}

#[test]
fn test_up_to_date_counter_leaves_graph_alone() {
    let chain = graph(vec![node("a", "chainner:utility:text", &[])], vec![]);
    let (migrated, ran) = legacy::run(chain.clone(), Some(LEGACY_MIGRATION_COUNT as u32)).unwrap();
    assert_eq!(ran, 0);
    // The text node's missing input would have been filled in by `empty_text_inputs`.
    assert_eq!(migrated, chain);
}

#[test]
fn test_array_input_data_is_accepted() {
    let chain = from_json(json!({
        "nodes": [{ "id": "a", "data": { "schemaId": "x", "inputData": [null, 5, "text"] } }],
    }));
    let inputs = &chain.nodes[0].data.input_data;
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs.get(&1), Some(&json!(5)));
    assert_eq!(inputs.get(&2), Some(&json!("text")));
}

#[test]
fn test_assign_schema_ids() {
    let chain = from_json(json!({
        "nodes": [
            { "id": "a", "data": { "category": "PyTorch", "type": "Load Model", "inputData": {} } },
            { "id": "b", "data": { "category": "Utility", "type": "Text Append" } },
            { "id": "c", "data": { "id": "c", "schemaId": "chainner:image:view" } },
        ],
    }));

    let chain = apply("assign_schema_ids", chain);
    assert_eq!(chain.nodes[0].schema_id(), "chainner:pytorch:load_model");
    assert_eq!(chain.nodes[1].schema_id(), "chainner:utility:text_append");
    assert_eq!(chain.nodes[2].schema_id(), "chainner:image:view");
    assert!(chain.nodes[0].data.extra.get("category").is_none());
    assert!(chain.nodes[1].data.extra.get("type").is_none());
    assert_eq!(chain.nodes[1].data.id, "b");
}

#[test]
fn test_strip_embedded_definitions() {
    let chain = from_json(json!({
        "nodes": [{
            "id": "a",
            "data": {
                "schemaId": "chainner:image:view",
                "inputs": [{ "label": "Image" }],
                "icon": "BsEyeFill",
                "isLocked": true,
            },
        }],
    }));

    let chain = apply("strip_embedded_definitions", chain);
    let extra = &chain.nodes[0].data.extra;
    assert!(extra.get("inputs").is_none());
    assert!(extra.get("icon").is_none());
    assert_eq!(extra.get("isLocked"), Some(&json!(true)));
}

#[test]
fn test_qualify_handles() {
    let chain = from_json(json!({
        "nodes": [
            { "id": "a", "data": { "schemaId": "x" } },
            { "id": "b", "data": { "schemaId": "y" } },
        ],
        "edges": [{ "id": "e", "source": "a", "target": "b", "sourceHandle": "", "targetHandle": 2 }],
    }));

    let chain = apply("qualify_handles", chain);
    assert_eq!(chain.edges[0].source_handle, "a-0");
    assert_eq!(chain.edges[0].target_handle, "b-2");
    assert_eq!(chain.edges[0].input_slot(), Some(2));
}

#[test]
fn test_ensure_edge_ids() {
    let chain = from_json(json!({
        "nodes": [
            { "id": "a", "data": { "schemaId": "x" } },
            { "id": "b", "data": { "schemaId": "y" } },
        ],
        "edges": [
            { "source": "a", "target": "b", "sourceHandle": "a-0", "targetHandle": "b-0" },
            { "id": "", "source": "a", "target": "b", "sourceHandle": "a-0", "targetHandle": "b-0" },
            { "id": "keep", "source": "a", "target": "b", "sourceHandle": "a-1", "targetHandle": "b-1" },
        ],
    }));

    let chain = apply("ensure_edge_ids", chain);
    assert_eq!(chain.edges[0].id, derive_edge_id("a-0", "b-0"));
    assert!(!chain.edges[1].id.is_empty());
    assert_ne!(chain.edges[0].id, chain.edges[1].id);
    assert_eq!(chain.edges[2].id, "keep");
}

#[test]
fn test_remove_dangling_edges() {
    let chain = graph(
        vec![node("a", "x", &[]), node("b", "y", &[])],
        vec![edge("a", 0, "b", 0), edge("ghost", 0, "b", 1), edge("a", 0, "gone", 0)],
    );

    let chain = apply("remove_dangling_edges", chain);
    assert_eq!(chain.edges.len(), 1);
    assert_eq!(chain.edges[0].source, "a");
    assert_eq!(chain.edges[0].target, "b");
}

#[test]
fn test_rename_legacy_schemas() {
    let chain = graph(
        vec![
            node("a", "chainner:image:file_iterator", &[]),
            node("b", "chainner:utility:note", &[]),
            node("c", "chainner:image:view", &[]),
        ],
        vec![],
    );

    let chain = apply("rename_legacy_schemas", chain);
    assert_eq!(chain.nodes[0].schema_id(), "chainner:image:load_images");
    assert_eq!(chain.nodes[1].schema_id(), "chainner:utility:comment");
    assert_eq!(chain.nodes[2].schema_id(), "chainner:image:view");
}

#[test]
fn test_opacity_to_percent() {
    let chain = graph(
        vec![node("a", "chainner:image:opacity", &[(1, json!(0.25))])],
        vec![],
    );
    let chain = apply("opacity_to_percent", chain);
    assert_eq!(chain.nodes[0].data.input_data.get(&1), Some(&json!(25.0)));
}

#[test]
fn test_blur_sigma_to_radius() {
    let chain = graph(
        vec![node(
            "a",
            "chainner:image:gaussian_blur",
            &[(1, json!(2.0)), (2, json!(0.5))],
        )],
        vec![],
    );
    let chain = apply("blur_sigma_to_radius", chain);
    assert_eq!(chain.nodes[0].data.input_data.get(&1), Some(&json!(6.0)));
    assert_eq!(chain.nodes[0].data.input_data.get(&2), Some(&json!(1.5)));
}

#[test]
fn test_split_rotate_flip() {
    let chain = graph(
        vec![
            node("src", "chainner:image:load", &[]),
            node("mode", "chainner:utility:number", &[]),
            node(
                "r",
                "chainner:image:rotate_flip",
                &[(1, json!(90)), (2, json!(1))],
            )
            .with_position(100.0, 50.0),
            node("dst", "chainner:image:save", &[]),
        ],
        vec![
            edge("src", 0, "r", 0),
            edge("mode", 0, "r", 2),
            edge("r", 0, "dst", 0),
        ],
    );

    let migrated = apply("split_rotate_flip", chain.clone());
    let flip_id = derive_unique_id("r", "flip");

    assert_eq!(migrated.nodes.len(), 5);
    let rotate = migrated.node("r").expect("rotate node kept");
    assert_eq!(rotate.schema_id(), "chainner:image:rotate");
    assert_eq!(rotate.data.input_data.get(&1), Some(&json!(90)));
    assert!(rotate.data.input_data.get(&2).is_none());

    let flip = migrated.node(&flip_id).expect("flip node created");
    assert_eq!(flip.schema_id(), "chainner:image:flip");
    assert_eq!(flip.data.input_data.get(&1), Some(&json!(1)));
    assert_eq!(flip.position.x, 400.0);
    assert_eq!(flip.position.y, 50.0);

    // The image flows src -> rotate -> flip -> dst; the mode now feeds the flip node.
    let out = migrated.inbound_edges("dst").next().expect("dst still connected");
    assert_eq!(out.source, flip_id);
    assert_eq!(out.output_slot(), Some(0));
    let mode = migrated.outbound_edges("mode").next().expect("mode still connected");
    assert_eq!(mode.target, flip_id);
    assert_eq!(mode.input_slot(), Some(1));
    let link = migrated.inbound_edges(&flip_id).find(|e| e.source == "r");
    assert!(link.is_some());
    assert_eq!(migrated.inbound_edges("r").count(), 1);

    // Re-running over the same input derives the same ids.
    assert_eq!(apply("split_rotate_flip", chain), migrated);
}

#[test]
fn test_iterator_geometry() {
    let mut chain = from_json(json!({
        "nodes": [
            {
                "id": "it",
                "position": { "x": 100, "y": 100 },
                "data": { "schemaId": "chainner:image:load_images", "iteratorSize": { "width": 500, "height": 400 } },
            },
            { "id": "child", "position": { "x": 150, "y": 180 }, "data": { "schemaId": "x" } },
            { "id": "free", "position": { "x": 150, "y": 180 }, "data": { "schemaId": "x" } },
        ],
    }));
    chain.nodes[1].parent_id = Some("it".to_string());

    let chain = apply("iterator_geometry", chain);
    assert_eq!(chain.nodes[0].width, Some(500.0));
    assert_eq!(chain.nodes[0].height, Some(400.0));
    assert!(chain.nodes[0].data.extra.get("iteratorSize").is_none());
    assert_eq!((chain.nodes[1].position.x, chain.nodes[1].position.y), (50.0, 80.0));
    assert_eq!((chain.nodes[2].position.x, chain.nodes[2].position.y), (150.0, 180.0));
}

#[test]
fn test_drop_save_image_quality_flag() {
    let chain = graph(
        vec![
            node("flag", "chainner:utility:bool", &[]),
            node("s", "chainner:image:save", &[(4, json!(95)), (5, json!(true))]),
        ],
        vec![edge("flag", 0, "s", 5)],
    );

    let chain = apply("drop_save_image_quality_flag", chain);
    let inputs = &chain.nodes[1].data.input_data;
    assert_eq!(inputs.get(&4), Some(&json!(95)));
    assert!(inputs.get(&5).is_none());
    assert!(chain.edges.is_empty());
}

#[test]
fn test_add_load_image_defaults() {
    let chain = graph(
        vec![
            node("a", "chainner:image:load", &[(0, json!("a.png"))]),
            node("b", "chainner:image:load", &[(1, json!(true))]),
        ],
        vec![],
    );

    let chain = apply("add_load_image_defaults", chain);
    assert_eq!(chain.nodes[0].data.input_data.get(&1), Some(&json!(false)));
    assert_eq!(chain.nodes[1].data.input_data.get(&1), Some(&json!(true)));
}

#[test]
fn test_dedupe_input_edges() {
    let mut duplicate = edge("a", 1, "b", 0);
    duplicate.id = "second".to_string();
    let chain = graph(
        vec![node("a", "x", &[]), node("b", "y", &[])],
        vec![edge("a", 0, "b", 0), duplicate, edge("a", 0, "b", 1)],
    );

    let chain = apply("dedupe_input_edges", chain);
    assert_eq!(chain.edges.len(), 2);
    assert_eq!(chain.edges[0].output_slot(), Some(0));
    assert_eq!(chain.edges[1].input_slot(), Some(1));
}

#[test]
fn test_color_hex_to_struct() {
    let chain = graph(
        vec![
            node("a", "chainner:utility:color", &[(0, json!("#ff0000"))]),
            node("b", "chainner:utility:color", &[(0, json!("#fff"))]),
            node("c", "chainner:utility:color", &[(0, json!({ "kind": "grayscale", "values": [0.5] }))]),
        ],
        vec![],
    );

    let chain = apply("color_hex_to_struct", chain);
    assert_eq!(
        chain.nodes[0].data.input_data.get(&0),
        Some(&json!({ "kind": "rgb", "values": [1.0, 0.0, 0.0] }))
    );
    assert_eq!(
        chain.nodes[1].data.input_data.get(&0),
        Some(&json!({ "kind": "rgb", "values": [1.0, 1.0, 1.0] }))
    );
    assert_eq!(
        chain.nodes[2].data.input_data.get(&0),
        Some(&json!({ "kind": "grayscale", "values": [0.5] }))
    );
}

#[test]
fn test_color_hex_to_struct_rejects_invalid_colors() {
    let chain = graph(
        vec![node("a", "chainner:utility:color", &[(0, json!("#12345"))])],
        vec![],
    );

    match (step("color_hex_to_struct").apply)(chain) {
        Err(MigrationError::LegacyStep { step, message }) => {
            assert_eq!(step, "color_hex_to_struct");
            assert!(message.contains("#12345"));
        }
        other => panic!("Expected LegacyStep error, got {:?}", other),
    }
}

#[test]
fn test_empty_text_inputs() {
    let chain = graph(
        vec![
            node("a", "chainner:utility:text", &[(0, Value::Null)]),
            node("b", "chainner:utility:text", &[]),
            node("c", "chainner:utility:text", &[(0, json!("hello"))]),
        ],
        vec![],
    );

    let chain = apply("empty_text_inputs", chain);
    assert_eq!(chain.nodes[0].data.input_data.get(&0), Some(&json!("")));
    assert_eq!(chain.nodes[1].data.input_data.get(&0), Some(&json!("")));
    assert_eq!(chain.nodes[2].data.input_data.get(&0), Some(&json!("hello")));
}

#[test]
fn test_normalize_viewport() {
    let mut chain = Graph::default();
    chain.viewport.zoom = 0.0;
    chain.viewport.x = f64::NAN;
    chain.viewport.y = 12.0;

    let chain = apply("normalize_viewport", chain);
    assert_eq!(chain.viewport.zoom, 1.0);
    assert_eq!(chain.viewport.x, 0.0);
    assert_eq!(chain.viewport.y, 12.0);
}

#[test]
fn test_full_sequence_on_pre_versioning_chain() {
    let chain = from_json(json!({
        "nodes": [
            { "id": "load", "data": { "category": "Image", "type": "Load Image", "inputData": ["a.png"] } },
            { "id": "op", "data": { "category": "Image", "type": "Opacity", "inputData": [null, 0.5] } },
            { "id": "save", "data": { "category": "Image", "type": "Save Image", "inputData": [null, "out", "x", "png", 90, true] } },
        ],
        "edges": [
            { "source": "load", "target": "op", "sourceHandle": "0", "targetHandle": "0" },
            { "source": "load", "target": "op", "sourceHandle": "0", "targetHandle": "0" },
            { "source": "op", "target": "save", "sourceHandle": "0", "targetHandle": "0" },
            { "source": "missing", "target": "save", "sourceHandle": "0", "targetHandle": "1" },
        ],
    }));

    let (chain, ran) = legacy::run(chain, None).expect("Legacy sequence failed");
    assert_eq!(ran, LEGACY_MIGRATION_COUNT);

    let ids: Vec<&str> = chain.nodes.iter().map(Node::schema_id).collect();
    assert_eq!(
        ids,
        ["chainner:image:load", "chainner:image:opacity", "chainner:image:save"]
    );
    assert_eq!(chain.node("op").unwrap().data.input_data.get(&1), Some(&json!(50.0)));
    assert!(chain.node("save").unwrap().data.input_data.get(&5).is_none());

    // Duplicate and dangling edges are gone; every remaining edge is qualified and unique.
    assert_eq!(chain.edges.len(), 2);
    let edge_ids: HashSet<&str> = chain.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(edge_ids.len(), 2);
    for edge in &chain.edges {
        assert!(chain.contains_node(&edge.source));
        assert!(chain.contains_node(&edge.target));
        assert!(edge.output_slot().is_some());
        assert!(edge.input_slot().is_some());
    }
}
