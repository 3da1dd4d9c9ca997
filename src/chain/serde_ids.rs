//! Deserialization helpers for slot-keyed maps.
//!
//! Structs with flattened fields or internally tagged enums are buffered by serde before
//! they reach their field deserializers, which turns JSON object keys into plain strings.
//! These helpers go through `serde_json::Value` and parse the slot ids themselves.

use super::definition::InputData;
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

fn parse_slot<E: Error>(key: &str) -> Result<u32, E> {
    key.trim()
        .parse()
        .map_err(|_| E::custom(format!("'{}' is not a valid slot id", key)))
}

/// Accepts `inputData` as an object keyed by slot id, or as an array indexed by slot id
/// (files written before inputs were keyed). `null` entries of arrays are skipped.
pub(crate) fn input_data<'de, D>(deserializer: D) -> Result<InputData, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(InputData::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| Ok((parse_slot::<D::Error>(&key)?, value)))
            .collect(),
        Value::Array(values) => Ok(values
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index as u32, value))
            .collect()),
        other => Err(D::Error::custom(format!(
            "expected inputData to be an object or array, found {}",
            other
        ))),
    }
}

/// A map keyed by slot id whose values are deserialized as `T`.
pub(crate) fn id_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<u32, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            let id = parse_slot::<D::Error>(&key)?;
            let value = T::deserialize(value).map_err(D::Error::custom)?;
            Ok((id, value))
        })
        .collect()
}

/// Reads a string that older files sometimes stored as a number or `null`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}
