//! # chain-migrate - Save File Migration Engine for Node Chains
//!
//! **chain-migrate** keeps chains (node graphs describing image-processing pipelines) written
//! by older releases loadable by the current one. Node types change over time: they are
//! renamed, gain and lose inputs, and renumber outputs. The save file envelope changes too.
//! This crate rewrites an old file into the current shape, deterministically, and tells the
//! caller whether the file was edited by hand.
//!
//! ## Core Workflow
//!
//! 1.  **Provide Node Schemas**: Hand the engine the current list of `NodeSchema`s, each with
//!     its append-only list of `Migration`s. Any provider format can be adapted through the
//!     `IntoSchemas` trait.
//! 2.  **Build a Migrator**: `Migrator::builder` registers every schema under its current and
//!     historical ids and orders all migrations globally, rejecting cyclic dependencies.
//! 3.  **Load**: `Migrator::load` decodes the file, checks its checksum, runs the legacy
//!     whole-graph migrations the file has not seen yet, then applies pending per-node
//!     migrations.
//! 4.  **Save**: `Migrator::save` writes the chain back with a fresh checksum and the current
//!     migration counter.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chain_migrate::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     // 1. The node definitions of the current release.
//!     let schemas = vec![NodeSchema::new(
//!         "chainner:image:resize",
//!         vec![
//!             Migration::rename("chainner:image:resize_factor"),
//!             Migration::ChangeInputs(ChangeInputs {
//!                 add: [(3, json!(true))].into_iter().collect(),
//!                 ..Default::default()
//!             }),
//!         ],
//!     )];
//!
//!     // 2. Build the migrator once and reuse it.
//!     let migrator = Migrator::builder(schemas).build()?;
//!
//!     // 3. Load and migrate a save file.
//!     let raw = std::fs::read_to_string("chain.chn")?;
//!     let loaded = migrator.load(&raw)?;
//!     if loaded.tampered_with {
//!         println!("Warning: this chain was modified outside the editor");
//!     }
//!     println!(
//!         "Applied {} node migrations to {} nodes",
//!         loaded.report.node_migrations, loaded.report.migrated_nodes
//!     );
//!
//!     // 4. Write it back in the current format.
//!     let saved = migrator.save(&loaded.graph, &semver::Version::new(0, 24, 0))?;
//!     std::fs::write("chain.chn", saved)?;
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod error;
pub mod ident;
pub mod legacy;
pub mod migrator;
pub mod prelude;
pub mod save;
pub mod schema;
