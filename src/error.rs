use thiserror::Error;

/// Errors that can occur while reading or writing a save file.
#[derive(Error, Debug)]
pub enum SaveFileError {
    #[error("Failed to parse save file JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Save file is neither JSON nor valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decoded save file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Save file version '{version}' is not a valid semantic version: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Save file must contain a JSON object at the top level, found {found}")]
    NotAnObject { found: String },

    #[error("Save file has no 'content' object")]
    MissingContent,

    #[error("Failed to migrate save file: {0}")]
    Migration(#[from] MigrationError),
}

/// Errors raised by the migration engine itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Circular migration dependency detected at '{key}'")]
    CircularDependency { key: String },

    #[error(
        "Migration '{key}' depends on '{dependency}' version {version}, which is not a known migration state"
    )]
    UnknownDependency {
        key: String,
        dependency: String,
        version: usize,
    },

    #[error("Legacy migration step '{step}' failed: {message}")]
    LegacyStep { step: &'static str, message: String },

    #[error("Migrations of schema '{schema_id}' were changed after release: {message}")]
    LockViolation { schema_id: String, message: String },
}

/// Errors that can occur when converting a provider format into `NodeSchema` definitions.
#[derive(Error, Debug, Clone)]
pub enum SchemaConversionError {
    #[error("Invalid schema data: {0}")]
    ValidationError(String),

    #[error("Failed to parse schema JSON: {0}")]
    JsonParseError(String),
}
