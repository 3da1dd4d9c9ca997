use super::definition::Migration;
use super::registry::SchemaMigrationRegistry;
use crate::error::MigrationError;
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Identifies one migration of one schema: `schemaId:migrationIndex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub schema_id: String,
    pub index: usize,
}

impl TaskKey {
    pub fn new(schema_id: impl Into<String>, index: usize) -> Self {
        Self {
            schema_id: schema_id.into(),
            index,
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema_id, self.index)
    }
}

/// The unit scheduled by the sorter.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationTask {
    pub schema_id: String,
    pub migration_index: usize,
    pub migration: Migration,
}

impl MigrationTask {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.schema_id.clone(), self.migration_index)
    }
}

/// One global order over every migration of every known schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    tasks: Vec<MigrationTask>,
}

impl MigrationPlan {
    pub fn tasks(&self) -> &[MigrationTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Position of a migration within the plan.
    pub fn position(&self, schema_id: &str, index: usize) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.schema_id == schema_id && t.migration_index == index)
    }
}

/// Dependencies between migrations. Each key lists the keys that must run before it.
pub(crate) struct DependencyGraph<'a> {
    registry: &'a SchemaMigrationRegistry,
    keys: Vec<TaskKey>,
    dependencies: AHashMap<TaskKey, Vec<TaskKey>>,
}

impl<'a> DependencyGraph<'a> {
    pub(crate) fn build(registry: &'a SchemaMigrationRegistry) -> Result<Self, MigrationError> {
        let mut keys = Vec::new();
        let mut dependencies: AHashMap<TaskKey, Vec<TaskKey>> = AHashMap::new();

        for schema in registry.schemas() {
            for (index, migration) in schema.migrations.iter().enumerate() {
                let key = TaskKey::new(schema.schema_id.clone(), index);
                keys.push(key.clone());
                dependencies.entry(key.clone()).or_default();

                if index > 0 {
                    add_dependency(
                        &mut dependencies,
                        key.clone(),
                        TaskKey::new(schema.schema_id.clone(), index - 1),
                    );
                }

                if let Migration::NodeDependency { schema_id, version } = migration {
                    let unknown = || MigrationError::UnknownDependency {
                        key: key.to_string(),
                        dependency: schema_id.clone(),
                        version: *version,
                    };
                    let dependency = registry.get(schema_id).ok_or_else(unknown)?;
                    if *version > dependency.version() {
                        return Err(unknown());
                    }

                    // Sandwich this migration between the dependency's `version - 1` and
                    // `version` migrations.
                    if *version > 0 {
                        add_dependency(
                            &mut dependencies,
                            key.clone(),
                            TaskKey::new(dependency.schema_id.clone(), version - 1),
                        );
                    }
                    if *version < dependency.version() {
                        add_dependency(
                            &mut dependencies,
                            TaskKey::new(dependency.schema_id.clone(), *version),
                            key.clone(),
                        );
                    }
                }
            }
        }

        Ok(Self {
            registry,
            keys,
            dependencies,
        })
    }

    /// Depth-first topological sort. Dependencies are emitted before their dependents.
    pub(crate) fn sort(self) -> Result<MigrationPlan, MigrationError> {
        let mut visiting = AHashSet::new();
        let mut visited = AHashSet::new();
        let mut order = Vec::with_capacity(self.keys.len());

        for key in &self.keys {
            self.visit(key, &mut visiting, &mut visited, &mut order)?;
        }

        let tasks = order
            .into_iter()
            .filter_map(|key| {
                let schema = self.registry.get(&key.schema_id)?;
                let migration = schema.migrations.get(key.index)?.clone();
                Some(MigrationTask {
                    schema_id: key.schema_id,
                    migration_index: key.index,
                    migration,
                })
            })
            .collect();

        Ok(MigrationPlan { tasks })
    }

    fn visit(
        &self,
        key: &TaskKey,
        visiting: &mut AHashSet<TaskKey>,
        visited: &mut AHashSet<TaskKey>,
        order: &mut Vec<TaskKey>,
    ) -> Result<(), MigrationError> {
        if visited.contains(key) {
            return Ok(());
        }
        if !visiting.insert(key.clone()) {
            return Err(MigrationError::CircularDependency {
                key: key.to_string(),
            });
        }

        if let Some(dependencies) = self.dependencies.get(key) {
            for dependency in dependencies {
                self.visit(dependency, visiting, visited, order)?;
            }
        }

        visiting.remove(key);
        visited.insert(key.clone());
        order.push(key.clone());
        Ok(())
    }
}

fn add_dependency(
    dependencies: &mut AHashMap<TaskKey, Vec<TaskKey>>,
    dependent: TaskKey,
    dependency: TaskKey,
) {
    // A migration pinned to its own schema's current position constrains nothing.
    if dependent == dependency {
        return;
    }
    let list = dependencies.entry(dependent).or_default();
    if !list.contains(&dependency) {
        list.push(dependency);
    }
}
