use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use std::fs;

/// A CLI tool to generate old-format chains for exercising the migration engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated chain to
    #[arg(short, long, default_value = "generated_chain.chn")]
    output: String,

    /// Number of nodes to generate
    #[arg(short, long, default_value_t = 50)]
    nodes: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Which historical file layout to write
    #[arg(long, value_enum, default_value_t = Layout::PreVersioning)]
    layout: Layout,

    /// Encode the file as base64
    #[arg(long)]
    base64: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Layout {
    /// Bare graph with category/name node identities and array inputs
    PreVersioning,
    /// Versioned envelope from before checksums were written
    Unchecked,
}

/// Node kinds as old releases identified them, with a generator for their inputs.
const NODE_KINDS: &[(&str, &str, fn(&mut StdRng) -> Value)] = &[
    ("Image", "Load Image", load_image_inputs),
    ("Image", "Save Image", save_image_inputs),
    ("Image", "Opacity", opacity_inputs),
    ("Image", "Gaussian Blur", blur_inputs),
    ("Image", "Rotate Flip", rotate_flip_inputs),
    ("Utility", "Color", color_inputs),
    ("Utility", "Text", text_inputs),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    if cli.nodes == 0 {
        eprintln!("Error: --nodes must be at least 1");
        std::process::exit(1);
    }

    println!(
        "Generating a {:?} chain with {} nodes (seed {})...",
        cli.layout, cli.nodes, seed
    );

    let nodes: Vec<Value> = (0..cli.nodes).map(|i| generate_node(&mut rng, i)).collect();
    let edges = generate_edges(&mut rng, cli.nodes);
    println!("-> Generated {} edges.", edges.len());

    let graph = json!({
        "nodes": nodes,
        "edges": edges,
        "viewport": { "x": 0.0, "y": 0.0, "zoom": 1.0 },
    });

    let document = match cli.layout {
        Layout::PreVersioning => graph,
        Layout::Unchecked => json!({
            "version": "0.5.2",
            "content": graph,
            "timestamp": "2022-03-01T12:00:00.000Z",
        }),
    };

    let mut output = serde_json::to_string_pretty(&document)?;
    if cli.base64 {
        use base64::Engine;
        output = base64::engine::general_purpose::STANDARD.encode(output);
    }
    fs::write(&cli.output, output)?;

    println!("Successfully generated and saved chain to '{}'", cli.output);
    Ok(())
}

fn generate_node(rng: &mut StdRng, index: usize) -> Value {
    let (category, name, inputs) = NODE_KINDS[rng.random_range(0..NODE_KINDS.len())];
    let id = format!("node-{:04}", index);
    json!({
        "id": id,
        "type": "regularNode",
        "position": {
            "x": rng.random_range(0.0..4000.0_f64).round(),
            "y": rng.random_range(0.0..3000.0_f64).round(),
        },
        "data": {
            "category": category,
            "type": name,
            "inputData": inputs(rng),
        },
    })
}

/// Wires earlier nodes into later ones, with a few duplicates and dangling endpoints.
fn generate_edges(rng: &mut StdRng, node_count: usize) -> Vec<Value> {
    let mut edges = Vec::new();
    for target in 1..node_count {
        if !rng.random_bool(0.7) {
            continue;
        }
        let source = rng.random_range(0..target);
        let copies = if rng.random_bool(0.05) { 2 } else { 1 };
        for _ in 0..copies {
            edges.push(json!({
                "source": format!("node-{:04}", source),
                "target": format!("node-{:04}", target),
                "sourceHandle": "0",
                "targetHandle": "0",
            }));
        }
    }
    if rng.random_bool(0.3) {
        edges.push(json!({
            "source": format!("node-{:04}", node_count + 1),
            "target": "node-0000",
            "sourceHandle": "0",
            "targetHandle": "1",
        }));
    }
    edges
}

// --- Input Generator Functions for Each Node Kind ---

fn load_image_inputs(rng: &mut StdRng) -> Value {
    json!([format!("C:/images/{:03}.png", rng.random_range(0..1000))])
}

fn save_image_inputs(rng: &mut StdRng) -> Value {
    json!([null, "C:/out", "result", "png", rng.random_range(50..=100), rng.random_bool(0.5)])
}

fn opacity_inputs(rng: &mut StdRng) -> Value {
    json!([null, (rng.random_range(0.0..1.0_f64) * 100.0).round() / 100.0])
}

fn blur_inputs(rng: &mut StdRng) -> Value {
    let sigma = rng.random_range(0.5..10.0_f64).round();
    json!([null, sigma, sigma])
}

fn rotate_flip_inputs(rng: &mut StdRng) -> Value {
    let angles = [0, 90, 180, 270];
    json!([null, angles[rng.random_range(0..angles.len())], rng.random_range(0..3)])
}

fn color_inputs(rng: &mut StdRng) -> Value {
    json!([format!("#{:06x}", rng.random_range(0..0x1000000))])
}

fn text_inputs(rng: &mut StdRng) -> Value {
    if rng.random_bool(0.5) {
        json!([null])
    } else {
        json!(["caption"])
    }
}
