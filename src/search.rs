//! Nearest-neighbor retrieval over index snapshots.
//!
//! [`SearchStrategy`] is a closed set of ranking strategies dispatched by one
//! exhaustive `match`; [`RetrievalEngine`] wraps a strategy with request
//! validation and result assembly.

pub mod engine;
pub mod fusion;
pub mod request;
pub mod strategy;

pub use engine::RetrievalEngine;
pub use request::{GetRequest, QueryRequest};
pub use strategy::{FusionMode, QueryEmbeddings, ScoredId, SearchOptions, SearchStrategy};
