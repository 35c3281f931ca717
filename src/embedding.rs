//! Mapping raw multimodal input to dense vectors.
//!
//! The model itself is a collaborator behind the [`Embedder`] trait.
//! [`EmbeddingDispatcher`] runs it over batches, sequentially or on a bounded
//! worker pool, with an optional [`EmbeddingCache`].

pub mod cache;
pub mod dispatch;
pub mod embedder;
pub mod precomputed;

pub use cache::{CacheStats, EmbeddingCache};
pub use dispatch::EmbeddingDispatcher;
pub use embedder::{Embedder, RawInput};
pub use precomputed::{PrecomputedEmbedder, PrecomputedEntry, PrecomputedTable};
