//! Whole-graph migrations for save files written before per-node schema migrations existed.
//!
//! The sequence is append-only. A save file records how many steps it has already passed
//! through (its migration counter), and only the steps after that point run on load. New
//! steps go at the end; existing steps are never reordered or edited once released.

use crate::chain::Graph;
use crate::error::MigrationError;

mod nodes;
mod structure;

/// Result type of a single legacy step.
pub type StepResult = Result<Graph, MigrationError>;

/// One historical fix, applied to graphs written before it existed.
#[derive(Clone, Copy)]
pub struct LegacyStep {
    pub name: &'static str,
    pub apply: fn(Graph) -> StepResult,
}

impl std::fmt::Debug for LegacyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyStep").field("name", &self.name).finish()
    }
}

macro_rules! legacy_steps {
    ( $( $module:ident :: $step:ident ),* $(,)? ) => {
        /// Every legacy step, in the order they were released.
        pub const LEGACY_MIGRATIONS: &[LegacyStep] = &[
            $( LegacyStep { name: stringify!($step), apply: $module::$step } ),*
        ];
    };
}

legacy_steps! {
    structure::assign_schema_ids,
    structure::strip_embedded_definitions,
    structure::qualify_handles,
    structure::ensure_edge_ids,
    structure::remove_dangling_edges,
    structure::rename_legacy_schemas,
    nodes::opacity_to_percent,
    nodes::blur_sigma_to_radius,
    nodes::split_rotate_flip,
    structure::iterator_geometry,
    nodes::drop_save_image_quality_flag,
    nodes::add_load_image_defaults,
    structure::dedupe_input_edges,
    nodes::color_hex_to_struct,
    nodes::empty_text_inputs,
    structure::normalize_viewport,
}

/// The migration counter stamped on every file written by this release.
pub const LEGACY_MIGRATION_COUNT: usize = LEGACY_MIGRATIONS.len();

/// Runs every step at or after `migration`. A missing counter runs the whole sequence.
///
/// Returns the migrated graph and the number of steps that ran.
pub fn run(graph: Graph, migration: Option<u32>) -> Result<(Graph, usize), MigrationError> {
    run_steps(LEGACY_MIGRATIONS, graph, migration)
}

/// Runs a custom sequence with the same gating rules as [`run`].
pub fn run_steps(
    steps: &[LegacyStep],
    graph: Graph,
    migration: Option<u32>,
) -> Result<(Graph, usize), MigrationError> {
    let start = migration.map_or(0, |m| m as usize);
    let pending = steps.get(start..).unwrap_or_default();

    let mut graph = graph;
    for step in pending {
        log::debug!("Applying legacy migration '{}'", step.name);
        graph = (step.apply)(graph)?;
    }
    Ok((graph, pending.len()))
}
