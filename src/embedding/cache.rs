//! Memoized embeddings keyed by modality and raw input.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::embedding::embedder::RawInput;
use crate::types::{Embedding, Modality};

/// Counters reported by [`EmbeddingCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe embedding cache.
///
/// Inserts never overwrite: the first embedding stored for a key wins, so
/// concurrent workers embedding the same input agree on one vector. Once the
/// capacity is reached new keys are no longer stored.
#[derive(Debug)]
pub struct EmbeddingCache {
    entries: RwLock<AHashMap<Modality, AHashMap<RawInput, Embedding>>>,
    capacity: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn get(&self, modality: Modality, input: &RawInput) -> Option<Embedding> {
        let found = self
            .entries
            .read()
            .get(&modality)
            .and_then(|inputs| inputs.get(input))
            .cloned();

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `embedding` unless the key is already cached.
    ///
    /// Returns the embedding now associated with the key: the existing one if
    /// another caller got there first, otherwise `embedding`.
    pub fn insert(&self, modality: Modality, input: RawInput, embedding: Embedding) -> Embedding {
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(&modality).and_then(|m| m.get(&input)) {
            return existing.clone();
        }

        let stored: usize = entries.values().map(|m| m.len()).sum();
        if let Some(capacity) = self.capacity
            && stored >= capacity
        {
            log::trace!("embedding cache full ({capacity} entries), skipping insert");
            return embedding;
        }

        entries
            .entry(modality)
            .or_default()
            .insert(input, embedding.clone());
        embedding
    }

    pub fn len(&self) -> usize {
        self.entries.read().values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
