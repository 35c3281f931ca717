//! Cosine similarity between query and candidate matrices.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PegasusError, Result};
use crate::util::simd::{dot_product, l2_norm};

/// Above this many query×candidate pairs, query rows are scored in parallel.
const PARALLEL_PAIR_THRESHOLD: usize = 16_384;

/// How a pair involving a zero-norm vector is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroNormPolicy {
    /// The pair scores 0, neither similar nor dissimilar.
    #[default]
    ScoreZero,
    /// The call fails with `InvalidDimension` naming the degenerate row.
    Reject,
}

impl ZeroNormPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ZeroNormPolicy::ScoreZero => "score_zero",
            ZeroNormPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for ZeroNormPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ZeroNormPolicy {
    type Err = PegasusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score_zero" | "zero" => Ok(ZeroNormPolicy::ScoreZero),
            "reject" => Ok(ZeroNormPolicy::Reject),
            other => Err(PegasusError::invalid_argument(format!(
                "unknown zero-norm policy {other:?}, expected score_zero or reject"
            ))),
        }
    }
}

/// Row-major Q×C matrix of similarity scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl ScoreMatrix {
    /// Build a matrix from rows of equal length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let row_count = rows.len();
        let mut data = Vec::with_capacity(row_count * cols);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(PegasusError::invalid_dimension(format!(
                    "score row {index} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: row_count,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Scores of query row `index` against every candidate.
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(|c| c.to_vec()).collect()
    }

    /// Elementwise mean of equally-shaped matrices.
    pub fn mean(matrices: &[ScoreMatrix]) -> Result<ScoreMatrix> {
        let Some(first) = matrices.first() else {
            return Err(PegasusError::invalid_argument(
                "cannot average an empty set of score matrices",
            ));
        };

        let mut data = vec![0.0f32; first.data.len()];
        for matrix in matrices {
            if matrix.rows != first.rows || matrix.cols != first.cols {
                return Err(PegasusError::invalid_dimension(format!(
                    "score matrix shape {}x{} does not match {}x{}",
                    matrix.rows, matrix.cols, first.rows, first.cols
                )));
            }
            for (acc, score) in data.iter_mut().zip(&matrix.data) {
                *acc += score;
            }
        }

        let count = matrices.len() as f32;
        data.iter_mut().for_each(|v| *v /= count);

        Ok(ScoreMatrix {
            rows: first.rows,
            cols: first.cols,
            data,
        })
    }
}

/// Cosine similarity of two vectors under the default zero-norm policy.
pub fn similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let scores = cosine_similarity(&[a], &[b], ZeroNormPolicy::default())?;
    Ok(scores.row(0)[0])
}

/// Compute `score[i][j] = dot(q_i, c_j) / (|q_i| |c_j|)` for every pair.
///
/// All rows of both matrices must share one dimensionality, otherwise the
/// call fails with `InvalidDimension`. Scores are clamped to `[-1, 1]`.
pub fn cosine_similarity<Q, C>(
    queries: &[Q],
    candidates: &[C],
    policy: ZeroNormPolicy,
) -> Result<ScoreMatrix>
where
    Q: AsRef<[f32]> + Sync,
    C: AsRef<[f32]> + Sync,
{
    let dimension = check_dimension(queries, candidates)?;
    let candidate_norms = norms(candidates, "candidate", policy)?;
    let query_norms = norms(queries, "query", policy)?;

    let score_row = |(query, query_norm): (&Q, &f32)| -> Vec<f32> {
        let query = query.as_ref();
        candidates
            .iter()
            .zip(&candidate_norms)
            .map(|(candidate, candidate_norm)| {
                let denominator = query_norm * candidate_norm;
                if denominator == 0.0 {
                    0.0
                } else {
                    (dot_product(query, candidate.as_ref()) / denominator).clamp(-1.0, 1.0)
                }
            })
            .collect()
    };

    let rows: Vec<Vec<f32>> = if queries.len() * candidates.len() >= PARALLEL_PAIR_THRESHOLD {
        queries
            .par_iter()
            .zip(query_norms.par_iter())
            .map(score_row)
            .collect()
    } else {
        queries.iter().zip(query_norms.iter()).map(score_row).collect()
    };

    log::trace!(
        "scored {}x{} pairs at dimension {dimension}",
        queries.len(),
        candidates.len()
    );

    Ok(ScoreMatrix {
        rows: queries.len(),
        cols: candidates.len(),
        data: rows.into_iter().flatten().collect(),
    })
}

fn check_dimension<Q: AsRef<[f32]>, C: AsRef<[f32]>>(
    queries: &[Q],
    candidates: &[C],
) -> Result<usize> {
    let expected = queries
        .first()
        .map(|q| q.as_ref().len())
        .or_else(|| candidates.first().map(|c| c.as_ref().len()))
        .unwrap_or(0);

    for (label, lens) in [
        ("query", queries.iter().map(|q| q.as_ref().len()).collect::<Vec<_>>()),
        (
            "candidate",
            candidates.iter().map(|c| c.as_ref().len()).collect::<Vec<_>>(),
        ),
    ] {
        if let Some((index, actual)) = lens.into_iter().enumerate().find(|(_, l)| *l != expected) {
            return Err(PegasusError::invalid_dimension(format!(
                "{label} row {index} has dimension {actual}, expected {expected}"
            )));
        }
    }

    Ok(expected)
}

fn norms<V: AsRef<[f32]>>(rows: &[V], label: &str, policy: ZeroNormPolicy) -> Result<Vec<f32>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let norm = l2_norm(row.as_ref());
            if norm == 0.0 && policy == ZeroNormPolicy::Reject {
                return Err(PegasusError::invalid_dimension(format!(
                    "{label} row {index} is a zero-norm vector"
                )));
            }
            Ok(norm)
        })
        .collect()
}
