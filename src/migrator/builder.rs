use super::Migrator;
use crate::error::MigrationError;
use crate::schema::{MigrationLock, NodeSchema, SchemaMigrationRegistry};

pub struct MigratorBuilder {
    schemas: Vec<NodeSchema>,
    lock: Option<MigrationLock>,
}

impl MigratorBuilder {
    pub fn new(schemas: Vec<NodeSchema>) -> Self {
        Self {
            schemas,
            lock: None,
        }
    }

    pub fn with_schema(mut self, schema: NodeSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Requires every schema recorded in `lock` to still start with its released migrations.
    pub fn with_lock(mut self, lock: MigrationLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn build(self) -> Result<Migrator, MigrationError> {
        let registry = SchemaMigrationRegistry::new(self.schemas);
        if registry.is_empty() {
            log::warn!("No node schemas were provided; chains will not be migrated per node");
        }
        if let Some(lock) = &self.lock {
            lock.verify(&registry)?;
        }

        let plan = registry.plan()?;
        log::info!(
            "Prepared {} node migrations across {} schemas",
            plan.len(),
            registry.len()
        );
        Ok(Migrator { registry, plan })
    }
}
