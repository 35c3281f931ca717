//! Retrieval engine that turns requests into collection-style results.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::filter::{CandidateFilter, validate_ids, validate_include};
use crate::index::IndexSnapshot;
use crate::search::request::{GetRequest, QueryRequest};
use crate::search::strategy::{SearchOptions, SearchStrategy};
use crate::types::{GetResult, Id, Include, Modality, QueryResult};

/// A configured strategy plus the request plumbing around it.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    config: SearchConfig,
    strategy: SearchStrategy,
}

impl RetrievalEngine {
    pub fn new(config: SearchConfig, strategy: SearchStrategy) -> Self {
        RetrievalEngine { config, strategy }
    }

    /// Build an engine from strategy wire names, resolving cross-modal targets
    /// against the configured modalities.
    pub fn from_names(config: SearchConfig, kind: &str, parameter: &str) -> Result<Self> {
        let strategy = SearchStrategy::from_names(kind, parameter, &config.modalities)?;
        Ok(RetrievalEngine::new(config, strategy))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn strategy(&self) -> &SearchStrategy {
        &self.strategy
    }

    /// Rank the snapshot for every query row.
    pub fn query(&self, snapshot: &IndexSnapshot, request: &QueryRequest) -> Result<QueryResult> {
        let include = match &request.include {
            Some(items) => validate_include(items, true)?,
            None => Include::query_default(),
        };
        let filter = CandidateFilter::new(
            request.where_clause.clone(),
            request.where_document.clone(),
        )?;
        let options = SearchOptions {
            filter,
            top_k: request.n_results.or(self.config.default_top_k),
            zero_norm_policy: self.config.zero_norm_policy,
        };

        let hits = self
            .strategy
            .search_scored(&request.query_embeddings, snapshot, &options)?;
        let result_modality = self.strategy.result_modality(&request.query_embeddings);

        log::info!(
            "{} query returned {} rows",
            self.strategy.name(),
            hits.len()
        );

        let ids: Vec<Vec<Id>> = hits
            .iter()
            .map(|row| row.iter().map(|hit| hit.id.clone()).collect())
            .collect();

        let mut result = QueryResult {
            ids,
            ..QueryResult::default()
        };
        for field in include {
            match field {
                Include::Distances => {
                    result.distances = Some(
                        hits.iter()
                            .map(|row| row.iter().map(|hit| 1.0 - hit.score).collect())
                            .collect(),
                    );
                }
                Include::Metadatas => {
                    result.metadatas = Some(map_rows(&result.ids, |id| {
                        snapshot.metadata(id).cloned()
                    }));
                }
                Include::Documents => {
                    result.documents = Some(map_rows(&result.ids, |id| {
                        snapshot.document(id).cloned()
                    }));
                }
                Include::Embeddings => {
                    let slice = match result_modality {
                        Some(modality) => Some(snapshot.slice(modality)?),
                        None => None,
                    };
                    result.embeddings = Some(map_rows(&result.ids, |id| {
                        slice
                            .and_then(|s| s.vector(id))
                            .cloned()
                            .unwrap_or_default()
                    }));
                }
            }
        }

        Ok(result)
    }

    /// Fetch items of one modality without ranking.
    ///
    /// With `ids` the result follows the requested order and skips unknown
    /// IDs; otherwise it follows the slice order. Filters apply before
    /// `offset` and `limit`.
    pub fn get(
        &self,
        snapshot: &IndexSnapshot,
        modality: Modality,
        request: &GetRequest,
    ) -> Result<GetResult> {
        let include = match &request.include {
            Some(items) => validate_include(items, false)?,
            None => Include::get_default(),
        };
        if let Some(ids) = &request.ids {
            validate_ids(ids)?;
        }
        let filter = CandidateFilter::new(
            request.where_clause.clone(),
            request.where_document.clone(),
        )?;
        let slice = snapshot.slice(modality)?;

        let requested: Box<dyn Iterator<Item = &Id> + '_> = match &request.ids {
            Some(ids) => Box::new(ids.iter().filter(|id| slice.position(id).is_some())),
            None => Box::new(slice.ids().iter()),
        };
        let ids: Vec<Id> = requested
            .filter(|id| {
                filter.is_empty()
                    || filter.matches(
                        snapshot.metadata(id),
                        snapshot.document(id).map(String::as_str),
                    )
            })
            .skip(request.offset)
            .take(request.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        log::debug!("get on {modality} matched {} items", ids.len());

        let mut result = GetResult {
            ids,
            ..GetResult::default()
        };
        for field in include {
            match field {
                Include::Metadatas => {
                    result.metadatas = Some(
                        result
                            .ids
                            .iter()
                            .map(|id| snapshot.metadata(id).cloned())
                            .collect(),
                    );
                }
                Include::Documents => {
                    result.documents = Some(
                        result
                            .ids
                            .iter()
                            .map(|id| snapshot.document(id).cloned())
                            .collect(),
                    );
                }
                Include::Embeddings => {
                    result.embeddings = Some(
                        result
                            .ids
                            .iter()
                            .map(|id| slice.vector(id).cloned().unwrap_or_default())
                            .collect(),
                    );
                }
                // Rejected by validate_include above.
                Include::Distances => {}
            }
        }

        Ok(result)
    }
}

fn map_rows<T, F>(rows: &[Vec<Id>], f: F) -> Vec<Vec<T>>
where
    F: Fn(&str) -> T,
{
    rows.iter()
        .map(|row| row.iter().map(|id| f(id.as_str())).collect())
        .collect()
}
