//! Structural checks for IDs and metadata.

use ahash::AHashMap;
use serde_json::Value;

use crate::error::{PegasusError, Result};
use crate::filter::path::describe;
use crate::types::{Id, Metadata, MetadataValue};

/// Validate a list of IDs.
///
/// Every ID must be non-empty. Duplicates fail with `DuplicateID`, naming each
/// repeated ID once, sorted.
pub fn validate_ids(ids: &[Id]) -> Result<&[Id]> {
    let mut counts: AHashMap<&str, usize> = AHashMap::with_capacity(ids.len());
    for (index, id) in ids.iter().enumerate() {
        if id.is_empty() {
            return Err(PegasusError::schema(
                format!("ids[{index}]"),
                "Expected ID to be a non-empty str",
            ));
        }
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }

    let mut duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        return Err(PegasusError::DuplicateId(duplicates));
    }

    Ok(ids)
}

/// Validate one metadata mapping and convert it to [`Metadata`].
///
/// Values must be strings, integers or floats.
pub fn validate_metadata(metadata: &Value) -> Result<Metadata> {
    parse_metadata(metadata, "metadata")
}

/// Validate a list of metadata mappings.
pub fn validate_metadatas(metadatas: &Value) -> Result<Vec<Metadata>> {
    let Value::Array(items) = metadatas else {
        return Err(PegasusError::schema(
            "metadatas",
            format!("Expected metadatas to be a list, got {}", describe(metadatas)),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_metadata(item, &format!("metadatas[{index}]")))
        .collect()
}

fn parse_metadata(value: &Value, path: &str) -> Result<Metadata> {
    let Value::Object(entries) = value else {
        return Err(PegasusError::schema(
            path,
            format!("Expected metadata to be a mapping, got {}", describe(value)),
        ));
    };

    let mut metadata = Metadata::with_capacity(entries.len());
    for (key, value) in entries {
        let parsed = match value {
            Value::String(s) => MetadataValue::Str(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetadataValue::Int(i),
                None => match n.as_f64() {
                    Some(f) => MetadataValue::Float(f),
                    None => {
                        return Err(PegasusError::schema(
                            format!("{path}.{key}"),
                            format!("Expected metadata value to be representable, got {n}"),
                        ));
                    }
                },
            },
            other => {
                return Err(PegasusError::schema(
                    format!("{path}.{key}"),
                    format!(
                        "Expected metadata value to be a str, int, or float, got {}",
                        describe(other)
                    ),
                ));
            }
        };
        metadata.insert(key.clone(), parsed);
    }

    Ok(metadata)
}
