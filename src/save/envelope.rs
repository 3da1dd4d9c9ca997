use super::checksum::content_hash;
use super::version::{missing_checksum_is_suspicious, parse_version};
use crate::chain::Graph;
use crate::error::SaveFileError;
use crate::legacy::{self, LEGACY_MIGRATION_COUNT};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// The on-disk wrapper around a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Number of legacy migrations already applied to `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration: Option<u32>,
}

/// A save file after decoding, tamper detection and the legacy migration sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSaveFile {
    pub content: Graph,
    pub tampered_with: bool,
    /// `None` for files written before save files were versioned.
    pub version: Option<Version>,
    pub timestamp: Option<String>,
    pub legacy_steps_run: usize,
}

/// Node fields that only describe editor state and are never written to disk.
const TRANSIENT_NODE_FIELDS: &[&str] = &["selected", "dragging"];
const TRANSIENT_NODE_DATA_FIELDS: &[&str] = &["invalid", "animated"];
const TRANSIENT_EDGE_FIELDS: &[&str] = &["selected", "dragging", "animated"];

/// Reads a save file, either plain JSON or base64-encoded JSON.
pub fn parse(raw: &str) -> Result<ParsedSaveFile, SaveFileError> {
    let text = decode(raw)?;
    let value: Value = serde_json::from_str(&text)?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(SaveFileError::NotAnObject {
                found: json_kind(&other).to_string(),
            });
        }
    };

    // A `null` version only marks a pre-versioning file when there is no envelope around it.
    let pre_versioning = match object.get("version") {
        None => true,
        Some(Value::Null) => !object.contains_key("content"),
        Some(_) => false,
    };
    if pre_versioning {
        log::info!("Reading a pre-versioning save file; running every legacy migration");
        let content: Graph = serde_json::from_value(Value::Object(object))?;
        let (content, legacy_steps_run) = legacy::run(content, None)?;
        return Ok(ParsedSaveFile {
            content,
            tampered_with: false,
            version: None,
            timestamp: None,
            legacy_steps_run,
        });
    }

    if !object.contains_key("content") {
        return Err(SaveFileError::MissingContent);
    }
    let envelope: SaveEnvelope = serde_json::from_value(Value::Object(object))?;
    let version = parse_version(&envelope.version)?;

    let tampered_with = match &envelope.checksum {
        Some(checksum) => *checksum != content_hash(&envelope.content),
        None => missing_checksum_is_suspicious(&version, envelope.migration),
    };
    if tampered_with {
        log::warn!("Save file (version {}) failed its integrity check", version);
    }

    log::debug!(
        "Reading save file version {} at migration {:?}",
        version,
        envelope.migration
    );
    let content: Graph = serde_json::from_value(envelope.content)?;
    let (content, legacy_steps_run) = legacy::run(content, envelope.migration)?;

    Ok(ParsedSaveFile {
        content,
        tampered_with,
        version: Some(version),
        timestamp: envelope.timestamp,
        legacy_steps_run,
    })
}

/// Serializes a chain into a save file stamped with the current time.
pub fn stringify(content: &Graph, version: &Version) -> Result<String, SaveFileError> {
    stringify_at(content, version, Utc::now())
}

/// Serializes a chain into a save file with an explicit timestamp.
pub fn stringify_at(
    content: &Graph,
    version: &Version,
    timestamp: DateTime<Utc>,
) -> Result<String, SaveFileError> {
    let content = serde_json::to_value(strip_transient(content.clone()))?;
    let envelope = SaveEnvelope {
        version: version.to_string(),
        checksum: Some(content_hash(&content)),
        content,
        timestamp: Some(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        migration: Some(LEGACY_MIGRATION_COUNT as u32),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Removes editor-only state from every node and edge.
pub fn strip_transient(mut content: Graph) -> Graph {
    for node in &mut content.nodes {
        for field in TRANSIENT_NODE_FIELDS {
            node.extra.remove(*field);
        }
        for field in TRANSIENT_NODE_DATA_FIELDS {
            node.data.extra.remove(*field);
        }
    }
    for edge in &mut content.edges {
        for field in TRANSIENT_EDGE_FIELDS {
            edge.extra.remove(*field);
        }
    }
    content
}

/// Plain JSON starts with `{`; anything else is treated as base64.
fn decode(raw: &str) -> Result<Cow<'_, str>, SaveFileError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        return Ok(Cow::Borrowed(trimmed));
    }
    let compact: String = trimmed.split_whitespace().collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    Ok(Cow::Owned(String::from_utf8(bytes)?))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
