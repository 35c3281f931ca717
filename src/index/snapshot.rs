//! Per-modality ID lists and row-aligned vector matrices.
//!
//! A snapshot is built once by the storage collaborator and then only read.
//! Construction enforces the invariants every search strategy relies on:
//! row `i` of a modality's matrix belongs to ID `i`, IDs are unique within a
//! modality, and all rows of a modality share one dimensionality.

use std::collections::{BTreeMap, HashMap};

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PegasusError, Result};
use crate::filter::validate_ids;
use crate::types::{Document, Embedding, Id, Metadata, Modality};

/// Summary of one modality slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub dimensionality: usize,
    pub elements: usize,
    pub time_created: DateTime<Utc>,
}

/// IDs and their vectors for one modality, in lockstep.
#[derive(Debug, Clone)]
pub struct ModalitySlice {
    ids: Vec<Id>,
    vectors: Vec<Embedding>,
    positions: AHashMap<Id, usize>,
}

impl ModalitySlice {
    /// Build a slice, checking lengths, ID uniqueness and dimensionality.
    pub fn new(ids: Vec<Id>, vectors: Vec<Embedding>) -> Result<Self> {
        if ids.len() != vectors.len() {
            return Err(PegasusError::invalid_argument(format!(
                "got {} ids but {} vectors; ids and vectors must be row-aligned",
                ids.len(),
                vectors.len()
            )));
        }
        validate_ids(&ids)?;

        if let Some(first) = vectors.first() {
            let expected = first.len();
            if let Some((row, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
                return Err(PegasusError::invalid_dimension(format!(
                    "vector for id {:?} (row {row}) has dimension {}, expected {expected}",
                    ids[row],
                    v.len()
                )));
            }
        }

        let positions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Ok(Self {
            ids,
            vectors,
            positions,
        })
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimensionality of the slice, `None` when empty.
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(|v| v.len())
    }

    /// Row of `id`, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn vector(&self, id: &str) -> Option<&Embedding> {
        self.position(id).map(|row| &self.vectors[row])
    }
}

/// Wire form of a slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceRecord {
    pub ids: Vec<Id>,
    pub embeddings: Vec<Embedding>,
}

/// Wire form of a snapshot, validated on conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub modalities: BTreeMap<Modality, SliceRecord>,
    #[serde(default)]
    pub metadatas: HashMap<Id, Metadata>,
    #[serde(default)]
    pub documents: HashMap<Id, Document>,
}

/// Immutable view of a collection, keyed by modality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord", into = "SnapshotRecord")]
pub struct IndexSnapshot {
    slices: BTreeMap<Modality, ModalitySlice>,
    metadatas: HashMap<Id, Metadata>,
    documents: HashMap<Id, Document>,
    created_at: DateTime<Utc>,
}

impl IndexSnapshot {
    pub fn builder() -> IndexSnapshotBuilder {
        IndexSnapshotBuilder::default()
    }

    /// The slice for `modality`.
    ///
    /// Fails with `NoDatapoints` when the modality is absent or holds no
    /// vectors, so a misconfigured modality never looks like zero matches.
    pub fn slice(&self, modality: Modality) -> Result<&ModalitySlice> {
        match self.slices.get(&modality) {
            Some(slice) if !slice.is_empty() => Ok(slice),
            _ => Err(PegasusError::no_datapoints(format!(
                "no vectors indexed for modality {modality}"
            ))),
        }
    }

    /// Modalities present in the snapshot, in declaration order.
    pub fn modalities(&self) -> impl Iterator<Item = Modality> + '_ {
        self.slices.keys().copied()
    }

    pub fn metadata(&self, id: &str) -> Option<&Metadata> {
        self.metadatas.get(id)
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Dimensionality, element count and creation time of one modality.
    pub fn index_metadata(&self, modality: Modality) -> Result<IndexMetadata> {
        let slice = self.slice(modality)?;
        Ok(IndexMetadata {
            dimensionality: slice.dimension().unwrap_or(0),
            elements: slice.len(),
            time_created: self.created_at,
        })
    }
}

impl TryFrom<SnapshotRecord> for IndexSnapshot {
    type Error = PegasusError;

    fn try_from(record: SnapshotRecord) -> Result<Self> {
        let mut builder = IndexSnapshot::builder();
        for (modality, slice) in record.modalities {
            builder = builder.slice(modality, slice.ids, slice.embeddings);
        }
        for (id, metadata) in record.metadatas {
            builder = builder.metadata(id, metadata);
        }
        for (id, document) in record.documents {
            builder = builder.document(id, document);
        }
        builder.build()
    }
}

impl From<IndexSnapshot> for SnapshotRecord {
    fn from(snapshot: IndexSnapshot) -> Self {
        SnapshotRecord {
            modalities: snapshot
                .slices
                .into_iter()
                .map(|(modality, slice)| {
                    (
                        modality,
                        SliceRecord {
                            ids: slice.ids,
                            embeddings: slice.vectors,
                        },
                    )
                })
                .collect(),
            metadatas: snapshot.metadatas,
            documents: snapshot.documents,
        }
    }
}

/// Builder for [`IndexSnapshot`]; all checks run in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct IndexSnapshotBuilder {
    slices: Vec<(Modality, Vec<Id>, Vec<Embedding>)>,
    metadatas: HashMap<Id, Metadata>,
    documents: HashMap<Id, Document>,
}

impl IndexSnapshotBuilder {
    pub fn slice(mut self, modality: Modality, ids: Vec<Id>, vectors: Vec<Embedding>) -> Self {
        self.slices.push((modality, ids, vectors));
        self
    }

    pub fn metadata(mut self, id: impl Into<Id>, metadata: Metadata) -> Self {
        self.metadatas.insert(id.into(), metadata);
        self
    }

    pub fn document(mut self, id: impl Into<Id>, document: impl Into<Document>) -> Self {
        self.documents.insert(id.into(), document.into());
        self
    }

    pub fn build(self) -> Result<IndexSnapshot> {
        let mut slices = BTreeMap::new();
        for (modality, ids, vectors) in self.slices {
            let slice = ModalitySlice::new(ids, vectors)?;
            if slices.insert(modality, slice).is_some() {
                return Err(PegasusError::invalid_argument(format!(
                    "modality {modality} supplied more than once"
                )));
            }
        }

        log::debug!(
            "built index snapshot with {} modalities, {} metadatas, {} documents",
            slices.len(),
            self.metadatas.len(),
            self.documents.len()
        );

        Ok(IndexSnapshot {
            slices,
            metadatas: self.metadatas,
            documents: self.documents,
            created_at: Utc::now(),
        })
    }
}
