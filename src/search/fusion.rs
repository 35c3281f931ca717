//! Multimodal fusion over row-aligned candidates.
//!
//! Only items present in every fused modality are candidates; an item missing
//! from one modality is excluded rather than scored against a partial vector.
//! Candidates keep the order of the first fused modality's slice.

use std::collections::BTreeMap;

use crate::error::{PegasusError, Result};
use crate::index::{IndexSnapshot, ModalitySlice};
use crate::search::strategy::{
    FusionMode, ScoredId, SearchOptions, check_query_dimension, passes, rank_rows,
};
use crate::types::{Embedding, Id, Modality};
use crate::vector::{ScoreMatrix, cosine_similarity};

/// Candidates shared by every fused modality.
struct AlignedCandidates<'s> {
    slices: Vec<(Modality, &'s ModalitySlice)>,
    ids: Vec<&'s Id>,
    /// `rows[c][m]` is the row of candidate `c` in slice `m`.
    rows: Vec<Vec<usize>>,
}

impl<'s> AlignedCandidates<'s> {
    fn vectors(&self, slice: usize) -> Vec<&'s [f32]> {
        let (_, s) = self.slices[slice];
        self.rows
            .iter()
            .map(|rows| s.vectors()[rows[slice]].as_slice())
            .collect()
    }

    fn concatenated(&self) -> Vec<Embedding> {
        self.rows
            .iter()
            .map(|rows| {
                self.slices
                    .iter()
                    .zip(rows)
                    .flat_map(|((_, s), &row)| s.vectors()[row].iter().copied())
                    .collect()
            })
            .collect()
    }
}

fn align<'s>(
    per_modality: &BTreeMap<Modality, Vec<Embedding>>,
    snapshot: &'s IndexSnapshot,
    options: &SearchOptions,
) -> Result<AlignedCandidates<'s>> {
    let slices = per_modality
        .iter()
        .map(|(modality, queries)| {
            let slice = snapshot.slice(*modality)?;
            check_query_dimension(queries, slice, *modality)?;
            Ok((*modality, slice))
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(&(_, first)) = slices.first() else {
        return Err(PegasusError::invalid_argument(
            "fusion search needs at least one modality",
        ));
    };

    let mut ids = Vec::new();
    let mut rows = Vec::new();
    let mut complete = 0usize;
    let mut incomplete = 0usize;

    for id in first.ids() {
        let positions: Option<Vec<usize>> = slices.iter().map(|(_, s)| s.position(id)).collect();
        let Some(positions) = positions else {
            incomplete += 1;
            continue;
        };
        complete += 1;
        if passes(snapshot, &options.filter, id) {
            ids.push(id);
            rows.push(positions);
        }
    }

    if incomplete > 0 {
        log::debug!("excluded {incomplete} items missing at least one fused modality");
    }
    if complete == 0 {
        let names: Vec<&str> = slices.iter().map(|(m, _)| m.name()).collect();
        return Err(PegasusError::no_datapoints(format!(
            "no item has vectors for every fused modality ({})",
            names.join(", ")
        )));
    }

    Ok(AlignedCandidates { slices, ids, rows })
}

/// Rank fused candidates for each query row.
pub(crate) fn rank_fused(
    mode: FusionMode,
    per_modality: &BTreeMap<Modality, Vec<Embedding>>,
    snapshot: &IndexSnapshot,
    options: &SearchOptions,
) -> Result<Vec<Vec<ScoredId>>> {
    let candidates = align(per_modality, snapshot, options)?;

    let scores = match mode {
        FusionMode::Early => {
            let query_rows = per_modality.values().next().map(Vec::len).unwrap_or(0);
            let queries: Vec<Embedding> = (0..query_rows)
                .map(|row| {
                    per_modality
                        .values()
                        .flat_map(|matrix| matrix[row].iter().copied())
                        .collect()
                })
                .collect();
            cosine_similarity(&queries, &candidates.concatenated(), options.zero_norm_policy)?
        }
        FusionMode::Late => {
            let matrices = per_modality
                .values()
                .enumerate()
                .map(|(slice, queries)| {
                    cosine_similarity(
                        queries,
                        &candidates.vectors(slice),
                        options.zero_norm_policy,
                    )
                })
                .collect::<Result<Vec<ScoreMatrix>>>()?;
            ScoreMatrix::mean(&matrices)?
        }
    };

    Ok(rank_rows(&scores, &candidates.ids, options.top_k))
}
