//! Embedder backed by vectors computed out of band.
//!
//! [`PrecomputedEmbedder`] never runs a model. It answers from a lookup table
//! of `(modality, input) -> vector`, which makes it the embedder of choice when
//! vectors were produced by an external pipeline, and in tests.
//!
//! # Example
//!
//! ```
//! use pegasus::embedding::{Embedder, PrecomputedEmbedder, RawInput};
//! use pegasus::types::Modality;
//!
//! let embedder = PrecomputedEmbedder::new(2)
//!     .with(Modality::Text, "a cat", vec![1.0, 0.0])
//!     .unwrap();
//!
//! let vector = embedder.embed(Modality::Text, &RawInput::from("a cat")).unwrap();
//! assert_eq!(vector, vec![1.0, 0.0]);
//! assert!(embedder.embed(Modality::Text, &RawInput::from("a dog")).is_err());
//! ```

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::embedding::embedder::{Embedder, RawInput};
use crate::error::{PegasusError, Result};
use crate::types::{Embedding, Modality};

/// One row of a precomputed table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedEntry {
    pub modality: Modality,
    pub input: RawInput,
    pub embedding: Embedding,
}

/// Wire form of a precomputed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedTable {
    pub dimension: usize,
    #[serde(default)]
    pub entries: Vec<PrecomputedEntry>,
}

/// Lookup-table embedder.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedEmbedder {
    dimension: usize,
    table: AHashMap<Modality, AHashMap<RawInput, Embedding>>,
}

impl PrecomputedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: AHashMap::new(),
        }
    }

    /// Build from a table, checking every vector's dimension.
    pub fn from_table(table: PrecomputedTable) -> Result<Self> {
        let mut embedder = Self::new(table.dimension);
        for entry in table.entries {
            embedder.insert(entry.modality, entry.input, entry.embedding)?;
        }
        Ok(embedder)
    }

    /// Load a JSON table file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table: PrecomputedTable = serde_json::from_str(&content)?;
        Self::from_table(table)
    }

    pub fn insert(
        &mut self,
        modality: Modality,
        input: impl Into<RawInput>,
        embedding: Embedding,
    ) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(PegasusError::invalid_dimension(format!(
                "precomputed {modality} vector has dimension {}, expected {}",
                embedding.len(),
                self.dimension
            )));
        }
        self.table
            .entry(modality)
            .or_default()
            .insert(input.into(), embedding);
        Ok(())
    }

    pub fn with(
        mut self,
        modality: Modality,
        input: impl Into<RawInput>,
        embedding: Embedding,
    ) -> Result<Self> {
        self.insert(modality, input, embedding)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.table.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Embedder for PrecomputedEmbedder {
    fn embed(&self, modality: Modality, input: &RawInput) -> Result<Embedding> {
        self.table
            .get(&modality)
            .and_then(|inputs| inputs.get(input))
            .cloned()
            .ok_or_else(|| {
                PegasusError::model(anyhow::anyhow!(
                    "no precomputed {modality} vector for {}",
                    input.describe()
                ))
            })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Modalities with at least one stored vector.
    fn supported_modalities(&self) -> Vec<Modality> {
        let mut modalities: Vec<Modality> = self
            .table
            .iter()
            .filter(|(_, inputs)| !inputs.is_empty())
            .map(|(modality, _)| *modality)
            .collect();
        modalities.sort();
        modalities
    }

    fn name(&self) -> &str {
        "precomputed"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_lookup() {
        let embedder = PrecomputedEmbedder::new(2)
            .with(Modality::Vision, RawInput::Path("cat.png".into()), vec![0.0, 1.0])
            .unwrap()
            .with(Modality::Text, "cat", vec![1.0, 0.0])
            .unwrap();

        assert_eq!(embedder.len(), 2);
        assert_eq!(
            embedder.supported_modalities(),
            vec![Modality::Text, Modality::Vision]
        );
        assert_eq!(
            embedder
                .embed(Modality::Vision, &RawInput::Path("cat.png".into()))
                .unwrap(),
            vec![0.0, 1.0]
        );

        let err = embedder
            .embed(Modality::Vision, &RawInput::from("cat"))
            .unwrap_err();
        assert_eq!(err.kind(), "Model");
    }

    #[test]
    fn test_dimension_enforced() {
        let err = PrecomputedEmbedder::new(3)
            .with(Modality::Text, "cat", vec![1.0])
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidDimension");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"dimension": 2, "entries": [
                {{"modality": "text", "input": {{"text": "cat"}}, "embedding": [1.0, 0.0]}},
                {{"modality": "audio", "input": {{"bytes": [1, 2]}}, "embedding": [0.0, 1.0]}}
            ]}}"#
        )
        .unwrap();

        let embedder = PrecomputedEmbedder::from_file(file.path()).unwrap();
        assert_eq!(embedder.len(), 2);
        assert!(embedder.supports(Modality::Audio));
        assert!(!embedder.supports(Modality::Vision));
    }
}
