//! Descriptive statistics over `f64` series.

use serde::Serialize;

/// Mean, median, extremes and spread of a series.
///
/// Standard deviation and variance are population values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median; the mean of the middle pair for even lengths.
    pub median: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// Population variance.
    pub variance: f64,
}

impl Distribution {
    /// Statistics of `values`, or `None` when empty.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let (min, median, max) = min_median_max(values);
        Some(Self { mean, median, min, max, stddev: variance.sqrt(), variance })
    }
}

/// Minimum, median and maximum of `values`. All zero when empty.
pub fn min_median_max(values: &[f64]) -> (f64, f64, f64) {
    let sorted = sorted(values);
    let (Some(min), Some(max)) = (sorted.first(), sorted.last()) else {
        return (0.0, 0.0, 0.0);
    };
    let half = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 { (sorted[half - 1] + sorted[half]) / 2.0 } else { sorted[half] };
    (*min, median, *max)
}

/// The `percent`th percentile of `values`, zero when empty.
///
/// The rank is `percent / 100 * len`. A whole rank selects that element; a fractional rank
/// averages the two neighbours. Ranks below one select the smallest value.
pub fn percentile(values: &[f64], percent: f64) -> f64 {
    let sorted = sorted(values);
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = percent / 100.0 * sorted.len() as f64;
    let index = rank as usize;
    if rank < 1.0 {
        sorted[0]
    } else if rank.fract() == 0.0 {
        sorted[(index - 1).min(sorted.len() - 1)]
    } else if index < sorted.len() {
        (sorted[index - 1] + sorted[index]) / 2.0
    } else {
        sorted[sorted.len() - 1]
    }
}

/// p50, p75, p90, p95 and p99 of one series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    /// 50th percentile.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

impl Percentiles {
    /// Percentiles of `values`; zeros when empty.
    pub fn of(values: &[f64]) -> Self {
        Self {
            p50: percentile(values, 50.0),
            p75: percentile(values, 75.0),
            p90: percentile(values, 90.0),
            p95: percentile(values, 95.0),
            p99: percentile(values, 99.0),
        }
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
