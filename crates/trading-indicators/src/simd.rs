//! SIMD-accelerated reductions.
//!
//! Used when a window re-derives its aggregates from the raw ring contents.
//! These use the `wide` crate for portable 4-lane `f64` operations.

use wide::f64x4;

/// SIMD sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut simd_sum = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        simd_sum += values;
    }

    let mut sum = simd_sum.reduce_add();
    for &value in &data[chunks * 4..] {
        sum += value;
    }

    sum
}

/// First and second moments of `data` around `shift`: `(Σ(x-k), Σ(x-k)²)`.
pub fn shifted_moments_simd(data: &[f64], shift: f64) -> (f64, f64) {
    let chunks = data.len() / 4;
    let shift_vec = f64x4::splat(shift);
    let mut simd_s1 = f64x4::splat(0.0);
    let mut simd_s2 = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        let diff = values - shift_vec;
        simd_s1 += diff;
        simd_s2 += diff * diff;
    }

    let mut s1 = simd_s1.reduce_add();
    let mut s2 = simd_s2.reduce_add();
    for &value in &data[chunks * 4..] {
        let diff = value - shift;
        s1 += diff;
        s2 += diff * diff;
    }

    (s1, s2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_simd() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert!((sum_simd(&data) - 28.0).abs() < 1e-12);
    }

    #[test]
    fn test_shifted_moments() {
        // [2, 4, 6] around 4: diffs -2, 0, 2
        let (s1, s2) = shifted_moments_simd(&[2.0, 4.0, 6.0], 4.0);
        assert!(s1.abs() < 1e-12);
        assert!((s2 - 8.0).abs() < 1e-12);

        // Crosses a full SIMD chunk plus remainder
        let data: Vec<f64> = (1..=9).map(|i| i as f64).collect();
        let (s1, s2) = shifted_moments_simd(&data, 0.0);
        assert!((s1 - 45.0).abs() < 1e-12);
        assert!((s2 - 285.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(sum_simd(&[]), 0.0);
        assert_eq!(shifted_moments_simd(&[], 1.0), (0.0, 0.0));
    }
}
