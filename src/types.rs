//! Core data types shared by the filter, search and embedding layers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PegasusError, Result};

/// Opaque item identifier, unique within a collection.
pub type Id = String;

/// Dense embedding vector.
pub type Embedding = Vec<f32>;

/// Raw document content.
pub type Document = String;

/// Scalar metadata value. Booleans and nested values are not part of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Numeric view of this value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Str(_) => None,
        }
    }

    /// String view of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

/// Metadata attached to an item.
pub type Metadata = HashMap<String, MetadataValue>;

/// Input modality understood by the embedding model and the search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Vision,
    Audio,
    Thermal,
    Depth,
    Imu,
}

impl Modality {
    /// Every modality, in declaration order.
    pub const ALL: [Modality; 6] = [
        Modality::Text,
        Modality::Vision,
        Modality::Audio,
        Modality::Thermal,
        Modality::Depth,
        Modality::Imu,
    ];

    /// Wire name of this modality.
    pub fn name(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Vision => "vision",
            Modality::Audio => "audio",
            Modality::Thermal => "thermal",
            Modality::Depth => "depth",
            Modality::Imu => "imu",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Modality {
    type Err = PegasusError;

    fn from_str(s: &str) -> Result<Self> {
        Modality::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Modality::ALL.iter().map(|m| m.name()).collect();
                PegasusError::invalid_argument(format!(
                    "unknown modality {s:?}, expected one of {}",
                    names.join(", ")
                ))
            })
    }
}

/// A result field that can be requested by `get` and `query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Embeddings,
    Metadatas,
    Distances,
}

impl Include {
    /// Wire name of this field.
    pub fn name(&self) -> &'static str {
        match self {
            Include::Documents => "documents",
            Include::Embeddings => "embeddings",
            Include::Metadatas => "metadatas",
            Include::Distances => "distances",
        }
    }

    /// Fields returned by a nearest-neighbor query when none are requested.
    pub fn query_default() -> Vec<Include> {
        vec![Include::Metadatas, Include::Documents, Include::Distances]
    }

    /// Fields returned by a plain fetch when none are requested.
    pub fn get_default() -> Vec<Include> {
        vec![Include::Metadatas, Include::Documents]
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value or a list of values on the wire.
///
/// A lone ID, document, metadata map or embedding is accepted wherever a list
/// of them is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Cast to a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

/// Result of a plain fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    pub ids: Vec<Id>,
    pub embeddings: Option<Vec<Embedding>>,
    pub documents: Option<Vec<Option<Document>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
}

/// Result of a nearest-neighbor query, one inner list per query row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<Id>>,
    pub embeddings: Option<Vec<Vec<Embedding>>>,
    pub documents: Option<Vec<Vec<Option<Document>>>>,
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    pub distances: Option<Vec<Vec<f32>>>,
}
