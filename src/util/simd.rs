//! SIMD kernels for dense vector arithmetic, using the `wide` crate.

use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load(chunk: &[f32]) -> f32x8 {
    let mut lanes = [0.0f32; LANES];
    lanes.copy_from_slice(chunk);
    f32x8::new(lanes)
}

/// Dot product of two equal-length slices.
///
/// Slices shorter than one lane width fall back to a scalar loop. Callers
/// check lengths; extra elements of the longer slice are ignored.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    if len < LANES {
        return a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    }

    let mut acc = f32x8::splat(0.0);
    let chunks_a = a.chunks_exact(LANES);
    let chunks_b = b.chunks_exact(LANES);
    let remainder_a = chunks_a.remainder();
    let remainder_b = chunks_b.remainder();

    for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
        acc = acc + load(chunk_a) * load(chunk_b);
    }

    let mut total: f32 = acc.to_array().iter().sum();
    total += remainder_a
        .iter()
        .zip(remainder_b.iter())
        .map(|(x, y)| x * y)
        .sum::<f32>();
    total
}

/// Euclidean (L2) norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}
