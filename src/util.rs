//! Shared utility modules used across Pegasus components.

pub mod simd;
