//! The embedding model seam.
//!
//! An [`Embedder`] maps one raw item of a modality to a dense vector. The
//! crate never loads a model itself; callers plug one in through this trait
//! and [`EmbeddingDispatcher`](crate::embedding::EmbeddingDispatcher) drives it.

use std::fmt::Debug;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Embedding, Modality};

/// Raw input handed to an embedder.
///
/// Inputs are hashable so embeddings can be memoized per `(modality, input)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawInput {
    /// Inline text.
    Text(String),

    /// A file on disk, such as an image or an audio clip.
    Path(PathBuf),

    /// Encoded bytes, such as an image payload.
    Bytes(Vec<u8>),
}

impl RawInput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawInput::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short description for log lines. Never includes payload bytes.
    pub fn describe(&self) -> String {
        match self {
            RawInput::Text(text) => format!("text ({} chars)", text.chars().count()),
            RawInput::Path(path) => format!("path {}", path.display()),
            RawInput::Bytes(bytes) => format!("{} bytes", bytes.len()),
        }
    }
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

impl From<String> for RawInput {
    fn from(text: String) -> Self {
        RawInput::Text(text)
    }
}

impl From<PathBuf> for RawInput {
    fn from(path: PathBuf) -> Self {
        RawInput::Path(path)
    }
}

/// A model that embeds raw items of one or more modalities.
///
/// Implementations must be `Send + Sync`; the dispatcher calls `embed` from
/// several worker threads at once.
pub trait Embedder: Send + Sync + Debug {
    /// Embed one item of `modality`.
    ///
    /// Model failures should be reported as
    /// [`PegasusError::Model`](crate::error::PegasusError::Model).
    fn embed(&self, modality: Modality, input: &RawInput) -> Result<Embedding>;

    /// Embed several items of one modality.
    ///
    /// The default implementation calls `embed` sequentially.
    fn embed_batch(&self, modality: Modality, inputs: &[RawInput]) -> Result<Vec<Embedding>> {
        inputs.iter().map(|input| self.embed(modality, input)).collect()
    }

    /// Dimensionality of every vector this embedder produces.
    fn dimension(&self) -> usize;

    fn supported_modalities(&self) -> Vec<Modality>;

    fn supports(&self, modality: Modality) -> bool {
        self.supported_modalities().contains(&modality)
    }

    /// Identifier used in log lines.
    fn name(&self) -> &str {
        "unknown"
    }
}
