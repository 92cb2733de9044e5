//! Percentile and dispersion math shared by outlier removal and valuation.

/// The `p`-th percentile (0..=100) of `sorted_values` using linear
/// interpolation between closest ranks. `sorted_values` must already be
/// sorted ascending and non-empty.
pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    assert!(!sorted_values.is_empty());
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }
    let rank = (p / 100.0) * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let fraction = rank - lower as f64;
        sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * fraction
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation (σ/μ), 0 when μ = 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let mean_value = mean(values);
    if mean_value == 0.0 {
        return 0.0;
    }
    stddev(values, mean_value) / mean_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_median_of_odd_count() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), 3.0);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = vec![10.0, 20.0, 30.0, 40.0];
        // rank = 0.1 * 3 = 0.3 -> between index 0 (10) and 1 (20)
        assert!((percentile(&values, 10.0) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn coefficient_of_variation_zero_mean_is_zero() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }
}
