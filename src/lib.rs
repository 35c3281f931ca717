//! # Pegasus
//!
//! Query-side core of a multimodal vector database.
//!
//! ## Features
//!
//! - A JSON filter grammar for metadata (`where`) and document text
//!   (`where_document`), validated and evaluated without recursion
//! - Cosine similarity over query and candidate matrices, SIMD accelerated
//! - Modality-specific, cross-modal and fused (early or late) retrieval
//! - Embedding dispatch over a bounded worker pool with a shared cache
//!
//! ## Example
//!
//! ```
//! use pegasus::index::IndexSnapshot;
//! use pegasus::search::{QueryEmbeddings, SearchStrategy};
//! use pegasus::types::Modality;
//!
//! let snapshot = IndexSnapshot::builder()
//!     .slice(
//!         Modality::Vision,
//!         vec!["a".into(), "b".into(), "c".into()],
//!         vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
//!     )
//!     .build()
//!     .unwrap();
//!
//! let strategy = SearchStrategy::modality_specific(Modality::Vision);
//! let query = QueryEmbeddings::Dense(vec![vec![1.0, 0.0]]);
//! let ranked = strategy.search(&query, &snapshot).unwrap();
//! assert_eq!(ranked, vec![vec!["a", "c", "b"]]);
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod search;
pub mod types;
pub mod util;
pub mod vector;

pub mod prelude {
    pub use crate::config::PegasusConfig;
    pub use crate::error::{PegasusError, Result};
    pub use crate::filter::{
        CandidateFilter, validate_ids, validate_include, validate_where, validate_where_document,
    };
    pub use crate::index::IndexSnapshot;
    pub use crate::search::{FusionMode, QueryEmbeddings, RetrievalEngine, SearchStrategy};
    pub use crate::types::{Include, Modality};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
