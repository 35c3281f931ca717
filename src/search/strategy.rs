//! Ranking strategies over an index snapshot.
//!
//! All strategies share one contract: constrain candidates, score them with
//! cosine similarity, rank each query row (most similar first, ties in
//! candidate order) and return the ranked IDs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PegasusError, Result};
use crate::filter::CandidateFilter;
use crate::index::{IndexSnapshot, ModalitySlice};
use crate::search::fusion;
use crate::types::{Embedding, Id, Modality};
use crate::vector::{ScoreMatrix, ZeroNormPolicy, cosine_similarity, top_k};

/// How per-modality signals are combined by [`SearchStrategy::Fusion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    /// Concatenate per-modality vectors, then score once.
    Early,
    /// Score each modality, then average the scores.
    Late,
}

impl FusionMode {
    pub fn name(&self) -> &'static str {
        match self {
            FusionMode::Early => "early",
            FusionMode::Late => "late",
        }
    }
}

impl fmt::Display for FusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FusionMode {
    type Err = PegasusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" => Ok(FusionMode::Early),
            "late" => Ok(FusionMode::Late),
            other => Err(PegasusError::invalid_argument(format!(
                "unknown fusion mode {other:?}, expected early or late"
            ))),
        }
    }
}

/// Query vectors handed to a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryEmbeddings {
    /// One matrix in the shared embedding space.
    Dense(Vec<Embedding>),
    /// One matrix per modality, row-aligned across modalities.
    PerModality(BTreeMap<Modality, Vec<Embedding>>),
}

impl QueryEmbeddings {
    /// Number of query rows. Per-modality matrices must agree on it.
    pub fn rows(&self) -> Result<usize> {
        match self {
            QueryEmbeddings::Dense(rows) => Ok(rows.len()),
            QueryEmbeddings::PerModality(per_modality) => {
                let mut counts = per_modality.iter().map(|(m, rows)| (*m, rows.len()));
                let Some((_, expected)) = counts.next() else {
                    return Ok(0);
                };
                match counts.find(|(_, n)| *n != expected) {
                    Some((modality, n)) => Err(PegasusError::invalid_argument(format!(
                        "query for modality {modality} has {n} rows, expected {expected}"
                    ))),
                    None => Ok(expected),
                }
            }
        }
    }
}

/// A candidate ID with its similarity to the query row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: Id,
    pub score: f32,
}

/// Per-call knobs shared by all strategies.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub filter: CandidateFilter,
    pub top_k: Option<usize>,
    pub zero_norm_policy: ZeroNormPolicy,
}

/// The closed set of ranking strategies.
///
/// Deserialization goes through the same checks as [`SearchStrategy::cross_modal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "strategy",
    rename_all = "snake_case",
    try_from = "StrategyRecord"
)]
pub enum SearchStrategy {
    /// Rank the candidates of one modality.
    ModalitySpecific { modality: Modality },
    /// Rank the candidates of the single modality other than the query's.
    CrossModal {
        query_modality: Modality,
        target_modality: Modality,
    },
    /// Combine several modalities before ranking.
    Fusion { mode: FusionMode },
}

#[derive(Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case", deny_unknown_fields)]
enum StrategyRecord {
    ModalitySpecific {
        modality: Modality,
    },
    CrossModal {
        query_modality: Modality,
        target_modality: Modality,
    },
    Fusion {
        mode: FusionMode,
    },
}

impl TryFrom<StrategyRecord> for SearchStrategy {
    type Error = PegasusError;

    fn try_from(record: StrategyRecord) -> Result<Self> {
        match record {
            StrategyRecord::ModalitySpecific { modality } => {
                Ok(SearchStrategy::modality_specific(modality))
            }
            StrategyRecord::CrossModal {
                query_modality,
                target_modality,
            } => SearchStrategy::cross_modal(query_modality, &[query_modality, target_modality]),
            StrategyRecord::Fusion { mode } => Ok(SearchStrategy::fusion(mode)),
        }
    }
}

impl SearchStrategy {
    pub fn modality_specific(modality: Modality) -> Self {
        SearchStrategy::ModalitySpecific { modality }
    }

    /// Resolve the target modality as `configured - {query_modality}`.
    ///
    /// Fails with `InvalidArgument` unless exactly one alternate modality is
    /// configured, or when the query modality itself is not configured.
    pub fn cross_modal(query_modality: Modality, configured: &[Modality]) -> Result<Self> {
        if !configured.contains(&query_modality) {
            return Err(PegasusError::invalid_argument(format!(
                "query modality {query_modality} is not among the configured modalities"
            )));
        }

        let mut others: Vec<Modality> = configured
            .iter()
            .copied()
            .filter(|m| *m != query_modality)
            .collect();
        others.sort();
        others.dedup();

        match others.as_slice() {
            [target] => Ok(SearchStrategy::CrossModal {
                query_modality,
                target_modality: *target,
            }),
            [] => Err(PegasusError::invalid_argument(format!(
                "cross-modal retrieval from {query_modality} needs a second configured modality"
            ))),
            many => {
                let names: Vec<&str> = many.iter().map(|m| m.name()).collect();
                Err(PegasusError::invalid_argument(format!(
                    "cross-modal retrieval from {query_modality} is ambiguous, candidates: {}",
                    names.join(", ")
                )))
            }
        }
    }

    pub fn fusion(mode: FusionMode) -> Self {
        SearchStrategy::Fusion { mode }
    }

    /// Build a strategy from its wire names.
    ///
    /// `kind` is one of `modality`, `cross_modal` or `fusion`; `parameter` is
    /// a modality name for the first two and a fusion mode for the last.
    pub fn from_names(kind: &str, parameter: &str, configured: &[Modality]) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "modality" | "modality_specific" => {
                Ok(SearchStrategy::modality_specific(parameter.parse()?))
            }
            "cross_modal" => SearchStrategy::cross_modal(parameter.parse()?, configured),
            "fusion" => Ok(SearchStrategy::fusion(parameter.parse()?)),
            other => Err(PegasusError::invalid_argument(format!(
                "unknown search strategy {other:?}, expected modality, cross_modal or fusion"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchStrategy::ModalitySpecific { .. } => "modality_specific",
            SearchStrategy::CrossModal { .. } => "cross_modal",
            SearchStrategy::Fusion { .. } => "fusion",
        }
    }

    /// Modality whose stored vectors represent a result for this query.
    pub fn result_modality(&self, query: &QueryEmbeddings) -> Option<Modality> {
        match (self, query) {
            (SearchStrategy::ModalitySpecific { modality }, _) => Some(*modality),
            (
                SearchStrategy::CrossModal {
                    target_modality, ..
                },
                _,
            ) => Some(*target_modality),
            (SearchStrategy::Fusion { .. }, QueryEmbeddings::PerModality(per_modality)) => {
                per_modality.keys().next().copied()
            }
            (SearchStrategy::Fusion { .. }, QueryEmbeddings::Dense(_)) => None,
        }
    }

    /// Ranked IDs, one list per query row.
    pub fn search(&self, query: &QueryEmbeddings, snapshot: &IndexSnapshot) -> Result<Vec<Vec<Id>>> {
        let scored = self.search_scored(query, snapshot, &SearchOptions::default())?;
        Ok(scored
            .into_iter()
            .map(|row| row.into_iter().map(|hit| hit.id).collect())
            .collect())
    }

    /// Ranked IDs with their scores, one list per query row.
    pub fn search_scored(
        &self,
        query: &QueryEmbeddings,
        snapshot: &IndexSnapshot,
        options: &SearchOptions,
    ) -> Result<Vec<Vec<ScoredId>>> {
        log::debug!("running {} search", self.name());

        match (self, query) {
            (SearchStrategy::ModalitySpecific { modality }, QueryEmbeddings::Dense(queries)) => {
                rank_modality(queries, *modality, snapshot, options)
            }
            (
                SearchStrategy::CrossModal {
                    query_modality,
                    target_modality,
                },
                QueryEmbeddings::Dense(_),
            ) if query_modality == target_modality => {
                Err(PegasusError::invalid_argument(format!(
                    "cross-modal retrieval from {query_modality} must target another modality"
                )))
            }
            (
                SearchStrategy::CrossModal {
                    target_modality, ..
                },
                QueryEmbeddings::Dense(queries),
            ) => rank_modality(queries, *target_modality, snapshot, options),
            (SearchStrategy::Fusion { mode }, QueryEmbeddings::PerModality(per_modality)) => {
                query.rows()?;
                fusion::rank_fused(*mode, per_modality, snapshot, options)
            }
            (SearchStrategy::Fusion { .. }, QueryEmbeddings::Dense(_)) => {
                Err(PegasusError::invalid_argument(
                    "fusion search needs query embeddings keyed by modality",
                ))
            }
            (_, QueryEmbeddings::PerModality(_)) => Err(PegasusError::invalid_argument(format!(
                "{} search needs a single query matrix",
                self.name()
            ))),
        }
    }
}

fn rank_modality(
    queries: &[Embedding],
    modality: Modality,
    snapshot: &IndexSnapshot,
    options: &SearchOptions,
) -> Result<Vec<Vec<ScoredId>>> {
    let slice = snapshot.slice(modality)?;
    check_query_dimension(queries, slice, modality)?;

    let (ids, vectors): (Vec<&Id>, Vec<&[f32]>) = slice
        .ids()
        .iter()
        .zip(slice.vectors())
        .filter(|(id, _)| passes(snapshot, &options.filter, id))
        .map(|(id, v)| (id, v.as_slice()))
        .unzip();

    let scores = cosine_similarity(queries, &vectors, options.zero_norm_policy)?;
    Ok(rank_rows(&scores, &ids, options.top_k))
}

/// Query rows must match the dimensionality of the modality they search.
pub(crate) fn check_query_dimension(
    queries: &[Embedding],
    slice: &ModalitySlice,
    modality: Modality,
) -> Result<()> {
    let Some(expected) = slice.dimension() else {
        return Ok(());
    };
    match queries.iter().enumerate().find(|(_, q)| q.len() != expected) {
        Some((row, q)) => Err(PegasusError::invalid_dimension(format!(
            "query row {row} has dimension {}, but {modality} vectors have dimension {expected}",
            q.len()
        ))),
        None => Ok(()),
    }
}

pub(crate) fn passes(snapshot: &IndexSnapshot, filter: &CandidateFilter, id: &str) -> bool {
    filter.is_empty()
        || filter.matches(
            snapshot.metadata(id),
            snapshot.document(id).map(String::as_str),
        )
}

pub(crate) fn rank_rows(scores: &ScoreMatrix, ids: &[&Id], k: Option<usize>) -> Vec<Vec<ScoredId>> {
    scores
        .iter_rows()
        .map(|row| {
            top_k(row, k)
                .into_iter()
                .map(|j| ScoredId {
                    id: ids[j].clone(),
                    score: row[j],
                })
                .collect()
        })
        .collect()
}
