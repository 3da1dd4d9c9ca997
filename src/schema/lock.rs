use super::definition::Migration;
use super::registry::SchemaMigrationRegistry;
use crate::error::MigrationError;
use crate::save::content_hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record of every schema's released migration history.
///
/// Migration lists may only grow. Verifying a registry against the lock of an earlier
/// release catches lists that were reordered, edited or truncated since.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationLock {
    pub schemata: BTreeMap<String, LockEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    pub count: usize,
    pub hash: String,
}

impl MigrationLock {
    pub fn from_registry(registry: &SchemaMigrationRegistry) -> Result<Self, serde_json::Error> {
        let schemata = registry
            .schemas()
            .map(|schema| {
                Ok((
                    schema.schema_id.clone(),
                    LockEntry {
                        count: schema.version(),
                        hash: prefix_hash(&schema.migrations)?,
                    },
                ))
            })
            .collect::<Result<_, serde_json::Error>>()?;
        Ok(Self { schemata })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks that every locked schema still starts with exactly its locked migrations.
    ///
    /// Schemas missing from the registry are skipped: removing a node type is allowed.
    pub fn verify(&self, registry: &SchemaMigrationRegistry) -> Result<(), MigrationError> {
        for (schema_id, entry) in &self.schemata {
            let Some(schema) = registry.get(schema_id) else {
                log::debug!("Locked schema '{}' is no longer registered", schema_id);
                continue;
            };
            if schema.schema_id != *schema_id {
                return Err(MigrationError::LockViolation {
                    schema_id: schema_id.clone(),
                    message: format!("now resolves to '{}' as an alias", schema.schema_id),
                });
            }
            if schema.version() < entry.count {
                return Err(MigrationError::LockViolation {
                    schema_id: schema_id.clone(),
                    message: format!(
                        "has {} migrations but {} were released",
                        schema.version(),
                        entry.count
                    ),
                });
            }
            let hash = prefix_hash(&schema.migrations[..entry.count]).map_err(|e| {
                MigrationError::LockViolation {
                    schema_id: schema_id.clone(),
                    message: e.to_string(),
                }
            })?;
            if hash != entry.hash {
                return Err(MigrationError::LockViolation {
                    schema_id: schema_id.clone(),
                    message: format!(
                        "the first {} migrations no longer match the released ones",
                        entry.count
                    ),
                });
            }
        }
        Ok(())
    }
}

fn prefix_hash(migrations: &[Migration]) -> Result<String, serde_json::Error> {
    Ok(content_hash(&serde_json::to_value(migrations)?))
}
