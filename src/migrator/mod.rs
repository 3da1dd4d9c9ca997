use crate::chain::Graph;
use crate::error::{MigrationError, SaveFileError};
use crate::save;
use crate::schema::applier::apply_migration;
use crate::schema::{MigrationPlan, NodeSchema, SchemaMigrationRegistry, SchemaMigrations};
use ahash::AHashMap;
use semver::Version;
use std::collections::BTreeSet;
use std::sync::Arc;

mod builder;

pub use builder::MigratorBuilder;

/// Brings chains written by any earlier release up to the current node schemas.
///
/// Building a migrator validates the schema registry once; afterwards it is immutable and
/// can migrate any number of graphs.
#[derive(Debug)]
pub struct Migrator {
    registry: SchemaMigrationRegistry,
    plan: MigrationPlan,
}

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Legacy whole-graph steps that ran while reading the file.
    pub legacy_steps: usize,
    /// Per-node migrations applied, summed over all nodes.
    pub node_migrations: usize,
    /// Nodes that had at least one migration applied.
    pub migrated_nodes: usize,
    /// Schema ids found in the graph that no registered schema knows.
    pub unknown_schemas: BTreeSet<String>,
}

/// A save file read and migrated to the current release.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedChain {
    pub graph: Graph,
    pub tampered_with: bool,
    /// The release that wrote the file, `None` for pre-versioning files.
    pub version: Option<Version>,
    pub report: MigrationReport,
}

struct NodeState {
    schema: Arc<SchemaMigrations>,
    initial: usize,
    version: usize,
}

impl Migrator {
    pub fn builder(schemas: Vec<NodeSchema>) -> MigratorBuilder {
        MigratorBuilder::new(schemas)
    }

    pub fn new(schemas: Vec<NodeSchema>) -> Result<Self, MigrationError> {
        Self::builder(schemas).build()
    }

    pub fn registry(&self) -> &SchemaMigrationRegistry {
        &self.registry
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Reads a save file and migrates its content.
    pub fn load(&self, raw: &str) -> Result<LoadedChain, SaveFileError> {
        let parsed = save::parse(raw)?;
        let (graph, mut report) = self.migrate_with_report(parsed.content);
        report.legacy_steps = parsed.legacy_steps_run;
        Ok(LoadedChain {
            graph,
            tampered_with: parsed.tampered_with,
            version: parsed.version,
            report,
        })
    }

    /// Writes a chain as a save file of the given release.
    pub fn save(&self, graph: &Graph, version: &Version) -> Result<String, SaveFileError> {
        save::stringify(graph, version)
    }

    pub fn migrate(&self, graph: Graph) -> Graph {
        self.migrate_with_report(graph).0
    }

    /// Applies every pending per-node migration.
    ///
    /// Migrations run in plan order: each task advances every node of its schema that sits
    /// exactly at that task's index. Within one node this is plain index order; across nodes
    /// it honours `node_dependency` constraints between schemas.
    pub fn migrate_with_report(&self, mut graph: Graph) -> (Graph, MigrationReport) {
        let mut report = MigrationReport::default();
        if self.registry.is_empty() {
            log::warn!("Schema registry is empty; returning chain unmodified");
            return (graph, report);
        }

        let mut states: Vec<Option<NodeState>> = Vec::with_capacity(graph.nodes.len());
        let mut by_schema: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (index, node) in graph.nodes.iter().enumerate() {
            match self.registry.resolve(&node.data) {
                Some((schema, version)) => {
                    by_schema
                        .entry(schema.schema_id.clone())
                        .or_default()
                        .push(index);
                    states.push(Some(NodeState {
                        schema,
                        initial: version,
                        version,
                    }));
                }
                None => {
                    if !node.data.schema_id.is_empty() {
                        log::debug!(
                            "Node '{}' has unknown schema '{}'; leaving it unmigrated",
                            node.id,
                            node.data.schema_id
                        );
                        report.unknown_schemas.insert(node.data.schema_id.clone());
                    }
                    states.push(None);
                }
            }
        }

        let Graph { nodes, edges, .. } = &mut graph;
        for task in self.plan.tasks() {
            let Some(indices) = by_schema.get(&task.schema_id) else {
                continue;
            };
            for &index in indices {
                let Some(state) = states[index].as_mut() else {
                    continue;
                };
                if state.version != task.migration_index {
                    continue;
                }
                apply_migration(&mut nodes[index], edges, &state.schema, task.migration_index);
                state.version += 1;
                report.node_migrations += 1;
            }
        }

        for (node, state) in nodes.iter_mut().zip(&states) {
            if let Some(state) = state {
                if state.version > state.initial {
                    report.migrated_nodes += 1;
                }
                node.data.schema_version = Some(state.version);
            }
        }

        if report.node_migrations > 0 {
            log::info!(
                "Applied {} migrations to {} nodes",
                report.node_migrations,
                report.migrated_nodes
            );
        }
        (graph, report)
    }
}
