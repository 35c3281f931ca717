//! Batch embedding on one thread or a bounded worker pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::EmbeddingConfig;
use crate::embedding::cache::EmbeddingCache;
use crate::embedding::embedder::{Embedder, RawInput};
use crate::error::{PegasusError, Result};
use crate::types::{Embedding, Modality};

/// Drives an [`Embedder`] over batches of raw inputs.
///
/// Output order always equals input order. In parallel mode every input is a
/// separate task on a fixed-size pool and results are reassembled by input
/// position; any failing task fails the whole batch.
#[derive(Debug)]
pub struct EmbeddingDispatcher {
    embedder: Arc<dyn Embedder>,
    cache: Option<EmbeddingCache>,
    pool: Option<ThreadPool>,
}

impl EmbeddingDispatcher {
    pub fn new(embedder: Arc<dyn Embedder>, config: &EmbeddingConfig) -> Result<Self> {
        let pool = if config.parallel {
            if config.workers == 0 {
                return Err(PegasusError::invalid_config(
                    "embedding.workers must be at least 1",
                ));
            }
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("pegasus-embed-{i}"))
                .build()
                .map_err(|e| {
                    PegasusError::ThreadPool(format!("Failed to create thread pool: {e}"))
                })?;
            Some(pool)
        } else {
            None
        };

        let cache = config
            .cache_enabled
            .then(|| EmbeddingCache::new(Some(config.cache_capacity)));

        log::debug!(
            "embedding dispatcher for {}: parallel={}, workers={}, cache={}",
            embedder.name(),
            config.parallel,
            config.workers,
            config.cache_enabled
        );

        Ok(Self {
            embedder,
            cache,
            pool,
        })
    }

    /// Single-threaded dispatcher without a cache.
    pub fn sequential(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            cache: None,
            pool: None,
        }
    }

    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Embed `inputs` of one modality, in input order.
    pub fn embed(&self, modality: Modality, inputs: &[RawInput]) -> Result<Vec<Embedding>> {
        if !self.embedder.supports(modality) {
            return Err(PegasusError::invalid_argument(format!(
                "embedder {} does not support modality {modality}",
                self.embedder.name()
            )));
        }

        match &self.pool {
            Some(pool) if inputs.len() > 1 => self.embed_parallel(pool, modality, inputs),
            _ => inputs
                .iter()
                .map(|input| self.embed_one(modality, input))
                .collect(),
        }
    }

    /// Embed one batch per modality, for fusion queries.
    pub fn embed_per_modality(
        &self,
        inputs: &BTreeMap<Modality, Vec<RawInput>>,
    ) -> Result<BTreeMap<Modality, Vec<Embedding>>> {
        inputs
            .iter()
            .map(|(modality, batch)| Ok((*modality, self.embed(*modality, batch)?)))
            .collect()
    }

    fn embed_one(&self, modality: Modality, input: &RawInput) -> Result<Embedding> {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(modality, input)
        {
            return Ok(hit);
        }

        let embedding = self.embedder.embed(modality, input)?;
        let expected = self.embedder.dimension();
        if embedding.len() != expected {
            return Err(PegasusError::invalid_dimension(format!(
                "embedder {} returned dimension {} for {modality} {}, expected {expected}",
                self.embedder.name(),
                embedding.len(),
                input.describe()
            )));
        }

        match &self.cache {
            Some(cache) => Ok(cache.insert(modality, input.clone(), embedding)),
            None => Ok(embedding),
        }
    }

    fn embed_parallel(
        &self,
        pool: &ThreadPool,
        modality: Modality,
        inputs: &[RawInput],
    ) -> Result<Vec<Embedding>> {
        let (sender, receiver) = crossbeam_channel::unbounded();

        pool.scope(|scope| {
            for (index, input) in inputs.iter().enumerate() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    // The receiver outlives the scope, so sending cannot fail.
                    let _ = sender.send((index, self.embed_one(modality, input)));
                });
            }
        });
        drop(sender);

        let mut slots: Vec<Option<Embedding>> = vec![None; inputs.len()];
        let mut failure: Option<(usize, PegasusError)> = None;
        for (index, result) in receiver.iter() {
            match result {
                Ok(embedding) => slots[index] = Some(embedding),
                Err(err) => {
                    if failure.as_ref().is_none_or(|(first, _)| index < *first) {
                        failure = Some((index, err));
                    }
                }
            }
        }

        if let Some((index, err)) = failure {
            log::warn!(
                "embedding batch of {} {modality} inputs failed at input {index}: {err}",
                inputs.len()
            );
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    PegasusError::ThreadPool(format!("no embedding produced for input {index}"))
                })
            })
            .collect()
    }
}
