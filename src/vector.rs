//! Dense vector similarity primitives.
//!
//! Every search strategy scores candidates through [`similarity::cosine_similarity`]
//! and orders them with [`ranking::rank_descending`]. Scores follow a single
//! convention: higher means more similar.

pub mod ranking;
pub mod similarity;

pub use self::ranking::{rank_descending, top_k};
pub use self::similarity::{ScoreMatrix, ZeroNormPolicy, cosine_similarity, similarity};
