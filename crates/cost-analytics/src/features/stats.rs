//! Small statistical helpers shared by the extractors and models

use statistical::{mean, standard_deviation};

/// Added to denominators that may be zero
pub const EPSILON: f64 = 1e-6;

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        mean(values)
    }
}

/// Sample standard deviation (n - 1), `None` with fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(standard_deviation(values, Some(mean(values))))
}

/// Percentile of a sorted slice with linear interpolation between closest ranks
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    match sorted_data.len() {
        0 => 0.0,
        1 => sorted_data[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted_data[lower] + (sorted_data[upper] - sorted_data[lower]) * weight
        }
    }
}

/// Sort a copy of the values ascending
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
