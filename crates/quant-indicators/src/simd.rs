//! Rolling-window kernels on `wide::f64x4`.

use wide::f64x4;

#[inline]
fn lanes(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let mut chunks = data.chunks_exact(4);
    let mut acc = f64x4::splat(0.0);
    for chunk in &mut chunks {
        acc += lanes(chunk);
    }
    acc.reduce_add() + chunks.remainder().iter().sum::<f64>()
}

/// Sum of squared deviations from `mean`.
fn sum_sq_dev(window: &[f64], mean: f64) -> f64 {
    let mean_vec = f64x4::splat(mean);
    let mut chunks = window.chunks_exact(4);
    let mut acc = f64x4::splat(0.0);
    for chunk in &mut chunks {
        let diff = lanes(chunk) - mean_vec;
        acc += diff * diff;
    }
    acc.reduce_add()
        + chunks
            .remainder()
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
}

/// Rolling mean. One output per full window.
pub fn rolling_mean_simd(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }
    let n = period as f64;
    data.windows(period).map(|w| sum_simd(w) / n).collect()
}

/// Rolling population standard deviation, paired with the window mean.
pub fn rolling_mean_std_simd(data: &[f64], period: usize) -> Vec<(f64, f64)> {
    if period < 2 || data.len() < period {
        return vec![];
    }
    let n = period as f64;
    data.windows(period)
        .map(|w| {
            let mean = sum_simd(w) / n;
            (mean, (sum_sq_dev(w, mean) / n).sqrt())
        })
        .collect()
}

/// Minimum and maximum of a slice.
pub fn minmax_simd(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let mut chunks = data.chunks_exact(4);
    let mut lo = f64x4::splat(f64::INFINITY);
    let mut hi = f64x4::splat(f64::NEG_INFINITY);
    for chunk in &mut chunks {
        let v = lanes(chunk);
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let (mut min, mut max) = lo
        .to_array()
        .iter()
        .zip(hi.to_array().iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), (l, h)| (a.min(*l), b.max(*h)));
    for &v in chunks.remainder() {
        min = min.min(v);
        max = max.max(v);
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_with_remainder() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((sum_simd(&data) - 55.0).abs() < 1e-12);
        assert_eq!(sum_simd(&[]), 0.0);
    }

    #[test]
    fn test_rolling_mean() {
        let data: Vec<f64> = (1..=6).map(f64::from).collect();
        let out = rolling_mean_simd(&data, 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0, 5.0]);
        assert!(rolling_mean_simd(&data, 0).is_empty());
    }

    #[test]
    fn test_rolling_std_matches_naive() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0, 3.0];
        let out = rolling_mean_std_simd(&data, 8);

        assert_eq!(out.len(), 2);
        assert!((out[0].0 - 5.0).abs() < 1e-12);
        assert!((out[0].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_minmax() {
        let data = vec![3.0, -1.0, 8.0, 2.0, 5.5, 9.5, 0.0];
        assert_eq!(minmax_simd(&data), Some((-1.0, 9.5)));
        assert_eq!(minmax_simd(&[4.0]), Some((4.0, 4.0)));
        assert_eq!(minmax_simd(&[]), None);
    }
}
