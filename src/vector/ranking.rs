//! Ordering of candidates by score.

use std::cmp::Ordering;

/// Candidate positions sorted by descending score.
///
/// The sort is stable: equal scores keep their original candidate order. NaN
/// scores rank below every real score.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));
    order
}

/// The `k` best positions, most similar first. `None` keeps every position.
pub fn top_k(scores: &[f32], k: Option<usize>) -> Vec<usize> {
    let mut order = rank_descending(scores);
    if let Some(k) = k {
        order.truncate(k);
    }
    order
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    let key = |v: f32| if v.is_nan() { f32::NEG_INFINITY } else { v };
    key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal)
}
