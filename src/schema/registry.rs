use super::definition::{Migration, NodeSchema};
use super::ordering::{DependencyGraph, MigrationPlan};
use crate::chain::NodeData;
use crate::error::MigrationError;
use ahash::AHashMap;
use itertools::Itertools;
use std::sync::Arc;

/// The migration history of one node type, shared by its current id and all its aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMigrations {
    pub schema_id: String,
    pub migrations: Vec<Migration>,
}

impl SchemaMigrations {
    /// The version a node reaches once every migration has been applied.
    pub fn version(&self) -> usize {
        self.migrations.len()
    }

    /// The id a node of this schema carries after migration `index` was applied.
    ///
    /// Each `rename` names the id a node had *before* it, so the name after `index` is the
    /// `old` of the next rename, or the current id when no rename follows.
    pub fn name_after(&self, index: usize) -> &str {
        self.migrations
            .iter()
            .skip(index + 1)
            .find_map(|m| match m {
                Migration::Rename { old } => Some(old.as_str()),
                _ => None,
            })
            .unwrap_or(self.schema_id.as_str())
    }

    /// The version of a node stored under `stored_id` that carries no explicit version.
    ///
    /// A node stored under some id must have passed every rename that led to that id.
    pub fn implicit_version(&self, stored_id: &str) -> usize {
        let renames: Vec<(usize, &str)> = self
            .migrations
            .iter()
            .enumerate()
            .filter_map(|(i, m)| match m {
                Migration::Rename { old } => Some((i, old.as_str())),
                _ => None,
            })
            .collect_vec();

        let next_rename = if stored_id == self.schema_id {
            None
        } else {
            renames.iter().position(|(_, old)| *old == stored_id)
        };

        let passed = match next_rename {
            Some(0) => None,
            Some(pos) => Some(renames[pos - 1].0),
            None => renames.last().map(|(i, _)| *i),
        };
        passed.map_or(0, |i| i + 1)
    }
}

/// Maps every known schema id, current or historical, to its migration history.
#[derive(Debug, Clone, Default)]
pub struct SchemaMigrationRegistry {
    entries: AHashMap<String, Arc<SchemaMigrations>>,
    canonical: Vec<String>,
}

impl SchemaMigrationRegistry {
    pub fn new(schemas: impl IntoIterator<Item = NodeSchema>) -> Self {
        let mut registry = Self::default();

        for schema in schemas {
            let entry = Arc::new(SchemaMigrations {
                schema_id: schema.schema_id,
                migrations: schema.migrations,
            });
            if registry
                .entries
                .insert(entry.schema_id.clone(), Arc::clone(&entry))
                .is_some()
            {
                log::warn!(
                    "Schema '{}' was registered twice; keeping the last definition",
                    entry.schema_id
                );
            } else {
                registry.canonical.push(entry.schema_id.clone());
            }
        }

        // Aliases come from the surviving definitions only. Current ids take precedence.
        let aliases = registry
            .canonical
            .iter()
            .filter_map(|id| registry.entries.get(id))
            .flat_map(|entry| {
                entry.migrations.iter().filter_map(move |m| match m {
                    Migration::Rename { old } => Some((old.clone(), Arc::clone(entry))),
                    _ => None,
                })
            })
            .collect_vec();
        for (old, entry) in aliases {
            match registry.entries.get(&old) {
                Some(existing) if existing.schema_id == entry.schema_id => {}
                Some(existing) => log::warn!(
                    "Ignoring alias '{}' of '{}': already registered for '{}'",
                    old,
                    entry.schema_id,
                    existing.schema_id
                ),
                None => {
                    registry.entries.insert(old, entry);
                }
            }
        }

        registry.canonical.sort();
        registry
    }

    /// Number of node types, not counting aliases.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Looks up a schema by its current or any historical id.
    pub fn get(&self, schema_id: &str) -> Option<&Arc<SchemaMigrations>> {
        self.entries.get(schema_id)
    }

    pub fn contains(&self, schema_id: &str) -> bool {
        self.entries.contains_key(schema_id)
    }

    /// The current id a stored id resolves to.
    pub fn canonical_id(&self, schema_id: &str) -> Option<&str> {
        self.get(schema_id).map(|s| s.schema_id.as_str())
    }

    /// Current schema ids in sorted order.
    pub fn schema_ids(&self) -> impl Iterator<Item = &str> {
        self.canonical.iter().map(String::as_str)
    }

    /// Current schemas in sorted order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<SchemaMigrations>> {
        self.canonical.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn target_version(&self, schema_id: &str) -> Option<usize> {
        self.get(schema_id).map(|s| s.version())
    }

    /// Resolves a node's schema and the number of its migrations already applied.
    pub fn resolve(&self, data: &NodeData) -> Option<(Arc<SchemaMigrations>, usize)> {
        let schema = self.get(&data.schema_id)?;
        let version = data
            .schema_version
            .unwrap_or_else(|| schema.implicit_version(&data.schema_id));
        Some((Arc::clone(schema), version))
    }

    /// Orders every migration of every schema, failing on unsatisfiable dependencies.
    pub fn plan(&self) -> Result<MigrationPlan, MigrationError> {
        DependencyGraph::build(self)?.sort()
    }
}
