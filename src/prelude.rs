//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the chain-migrate
//! crate. Import this module to get access to the core functionality without having to
//! import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use chain_migrate::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let schemas_json = std::fs::read_to_string("path/to/schemas.json")?;
//! let schemas = SchemaDocument::from_json(&schemas_json)?.into_schemas()?;
//!
//! let migrator = Migrator::new(schemas)?;
//! let loaded = migrator.load(&std::fs::read_to_string("path/to/chain.chn")?)?;
//!
//! println!("Loaded {} nodes (tampered: {})", loaded.graph.nodes.len(), loaded.tampered_with);
//! # Ok(())
//! # }
//! ```

// Engine
pub use crate::migrator::{LoadedChain, MigrationReport, Migrator, MigratorBuilder};

// Chain model
pub use crate::chain::{Edge, Graph, InputData, InputId, Node, NodeData, OutputId, Viewport};

// Schemas and migrations
pub use crate::schema::{
    ChangeInputs, ChangeOutputs, IntoSchemas, Migration, MigrationLock, MigrationPlan,
    MigrationTask, NodeSchema, SchemaDocument, SchemaMigrationRegistry,
};

// Save files
pub use crate::legacy::LEGACY_MIGRATION_COUNT;
pub use crate::save::{ParsedSaveFile, SaveEnvelope};

// Error types
pub use crate::error::{MigrationError, SaveFileError, SchemaConversionError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
