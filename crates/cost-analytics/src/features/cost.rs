//! Daily cost feature extraction
//!
//! Turns an ordered cost series into one [`FeatureVector`] per day: deltas,
//! trailing rolling statistics, a rolling z-score, calendar fields and lags.
//! Values that are undefined at the edges of the series (the first delta, a
//! rolling std over a single point, lags before the start) are filled forward,
//! then backward, then with zero.

use super::stats::{mean_or_zero, sample_std, EPSILON};
use crate::error::CostAnalyticsResult;
use crate::series::{daily_totals, CostObservation};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Short rolling window in days
pub const SHORT_WINDOW: usize = 7;
/// Long rolling window in days
pub const LONG_WINDOW: usize = 30;

/// Number of columns in the anomaly feature matrix
pub const ANOMALY_FEATURE_COUNT: usize = 10;

/// Column names of the anomaly feature matrix, in column order
pub const ANOMALY_FEATURE_NAMES: [&str; ANOMALY_FEATURE_COUNT] = [
    "daily_cost",
    "delta",
    "pct_change",
    "rolling_mean_7",
    "rolling_std_7",
    "z_score",
    "day_of_week",
    "is_weekend",
    "lag_1",
    "lag_7",
];

/// Derived features for one day of spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Billing day
    pub date: NaiveDate,
    /// Total spend for the day
    pub daily_cost: f64,
    /// Day-over-day change
    pub delta: f64,
    /// Day-over-day change in percent
    pub pct_change: f64,
    /// Trailing 7-day mean
    pub rolling_mean_7: f64,
    /// Trailing 7-day sample standard deviation
    pub rolling_std_7: f64,
    /// Trailing 30-day mean
    pub rolling_mean_30: f64,
    /// Trailing 30-day sample standard deviation
    pub rolling_std_30: f64,
    /// Distance from the 7-day mean in 7-day standard deviations
    pub z_score: f64,
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: u32,
    /// 1..=31
    pub day_of_month: u32,
    /// 1..=12
    pub month: u32,
    /// Calendar year
    pub year: i32,
    /// Saturday or Sunday
    pub is_weekend: bool,
    /// Cost one row earlier
    pub lag_1: f64,
    /// Cost seven rows earlier
    pub lag_7: f64,
    /// Cost thirty rows earlier
    pub lag_30: f64,
}

impl FeatureVector {
    /// Project onto the anomaly detector's fixed column subset
    pub fn anomaly_features(&self) -> [f64; ANOMALY_FEATURE_COUNT] {
        [
            self.daily_cost,
            self.delta,
            self.pct_change,
            self.rolling_mean_7,
            self.rolling_std_7,
            self.z_score,
            f64::from(self.day_of_week),
            if self.is_weekend { 1.0 } else { 0.0 },
            self.lag_1,
            self.lag_7,
        ]
    }
}

/// Windowed feature matrix consumed by the anomaly detector
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFeatureMatrix {
    /// Full feature records for the window, in date order
    pub features: Vec<FeatureVector>,
    /// Projected rows, parallel to `features`
    pub rows: Vec<[f64; ANOMALY_FEATURE_COUNT]>,
}

impl AnomalyFeatureMatrix {
    /// Column names in order
    pub fn feature_names(&self) -> Vec<String> {
        ANOMALY_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window contained no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Extract per-day features from a cost series.
///
/// Service-tagged observations are summed per day first. Input does not need to
/// be sorted; duplicate or non-finite observations are rejected.
pub fn extract_cost_features(
    observations: &[CostObservation],
) -> CostAnalyticsResult<Vec<FeatureVector>> {
    let daily = daily_totals(observations)?;
    if daily.is_empty() {
        return Ok(Vec::new());
    }

    let costs: Vec<f64> = daily.iter().map(|o| o.cost).collect();
    let n = costs.len();

    let delta: Vec<Option<f64>> = (0..n)
        .map(|i| (i > 0).then(|| costs[i] - costs[i - 1]))
        .collect();

    let pct_change: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i == 0 || costs[i - 1] == 0.0 {
                None
            } else {
                Some((costs[i] - costs[i - 1]) / costs[i - 1] * 100.0)
            }
        })
        .collect();

    let (mean_7, std_7) = rolling(&costs, SHORT_WINDOW);
    let (mean_30, std_30) = rolling(&costs, LONG_WINDOW);

    let z_score: Vec<Option<f64>> = (0..n)
        .map(|i| match (mean_7[i], std_7[i]) {
            (Some(m), Some(s)) => Some((costs[i] - m) / (s + EPSILON)),
            _ => None,
        })
        .collect();

    let delta = fill_gaps(&delta);
    let pct_change = fill_gaps(&pct_change);
    let mean_7 = fill_gaps(&mean_7);
    let std_7 = fill_gaps(&std_7);
    let mean_30 = fill_gaps(&mean_30);
    let std_30 = fill_gaps(&std_30);
    let z_score = fill_gaps(&z_score);
    let lag_1 = fill_gaps(&lag(&costs, 1));
    let lag_7 = fill_gaps(&lag(&costs, 7));
    let lag_30 = fill_gaps(&lag(&costs, 30));

    let features = daily
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let weekday = obs.date.weekday();
            FeatureVector {
                date: obs.date,
                daily_cost: obs.cost,
                delta: delta[i],
                pct_change: pct_change[i],
                rolling_mean_7: mean_7[i],
                rolling_std_7: std_7[i],
                rolling_mean_30: mean_30[i],
                rolling_std_30: std_30[i],
                z_score: z_score[i],
                day_of_week: weekday.num_days_from_monday(),
                day_of_month: obs.date.day(),
                month: obs.date.month(),
                year: obs.date.year(),
                is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
                lag_1: lag_1[i],
                lag_7: lag_7[i],
                lag_30: lag_30[i],
            }
        })
        .collect::<Vec<_>>();

    debug!(rows = features.len(), "Extracted cost features");
    Ok(features)
}

/// Restrict to the trailing `lookback_days` and project onto the anomaly columns.
///
/// The window is measured back from the newest date present, so a series that
/// stopped reporting a week ago still yields a full window.
pub fn prepare_anomaly_feature_matrix(
    observations: &[CostObservation],
    lookback_days: u32,
) -> CostAnalyticsResult<AnomalyFeatureMatrix> {
    let daily = daily_totals(observations)?;

    let windowed: Vec<CostObservation> = match daily.last().map(|o| o.date) {
        Some(max_date) => {
            let cutoff = max_date - ChronoDuration::days(i64::from(lookback_days));
            daily.into_iter().filter(|o| o.date >= cutoff).collect()
        }
        None => Vec::new(),
    };

    let features = extract_cost_features(&windowed)?;
    let rows = features.iter().map(FeatureVector::anomaly_features).collect();

    Ok(AnomalyFeatureMatrix { features, rows })
}

/// Trailing rolling mean and sample std with a minimum period of one
fn rolling(values: &[f64], window: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            (Some(mean_or_zero(slice)), sample_std(slice))
        })
        .unzip()
}

fn lag(values: &[f64], offset: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| (i >= offset).then(|| values[i - offset]))
        .collect()
}

/// Forward fill, then backward fill, then zero
fn fill_gaps(column: &[Option<f64>]) -> Vec<f64> {
    let mut last = None;
    let forward: Vec<Option<f64>> = column
        .iter()
        .map(|value| {
            if value.is_some() {
                last = *value;
            }
            last
        })
        .collect();

    let first_valid = forward.iter().flatten().next().copied();
    forward
        .into_iter()
        .map(|value| value.or(first_valid).unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(costs: &[f64]) -> Vec<CostObservation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        costs
            .iter()
            .enumerate()
            .map(|(i, &c)| CostObservation::new(start + ChronoDuration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_fill_gaps_order() {
        let column = vec![None, None, Some(2.0), None, Some(5.0), None];
        assert_eq!(fill_gaps(&column), vec![2.0, 2.0, 2.0, 2.0, 5.0, 5.0]);

        let empty: Vec<Option<f64>> = vec![None, None];
        assert_eq!(fill_gaps(&empty), vec![0.0, 0.0]);
    }

    #[test]
    fn test_single_row_resolves_to_zero() {
        let features = extract_cost_features(&series(&[120.0])).unwrap();
        assert_eq!(features.len(), 1);

        let f = &features[0];
        assert_eq!(f.pct_change, 0.0);
        assert_eq!(f.delta, 0.0);
        assert_eq!(f.lag_1, 0.0);
        assert_eq!(f.lag_7, 0.0);
        assert_eq!(f.lag_30, 0.0);
        assert_eq!(f.rolling_std_7, 0.0);
        assert_eq!(f.rolling_mean_7, 120.0);
        assert!(f.z_score.is_finite());
    }

    #[test]
    fn test_first_row_backfilled() {
        let features = extract_cost_features(&series(&[100.0, 110.0, 121.0])).unwrap();

        assert!((features[1].pct_change - 10.0).abs() < 1e-9);
        assert!((features[2].pct_change - 10.0).abs() < 1e-9);
        // First row takes the first defined value
        assert!((features[0].pct_change - 10.0).abs() < 1e-9);
        assert_eq!(features[0].delta, 10.0);
        assert_eq!(features[0].lag_1, 100.0);
        assert_eq!(features[2].lag_1, 110.0);
    }

    #[test]
    fn test_rolling_windows() {
        let costs: Vec<f64> = (1..=10).map(f64::from).collect();
        let features = extract_cost_features(&series(&costs)).unwrap();

        // Mean of 4..=10
        assert!((features[9].rolling_mean_7 - 7.0).abs() < 1e-9);
        // Mean of 1..=10, window not yet full
        assert!((features[9].rolling_mean_30 - 5.5).abs() < 1e-9);
        assert_eq!(features[9].lag_7, 3.0);
        // No 30-day lag exists, backfill has nothing to use
        assert_eq!(features[9].lag_30, 0.0);
    }

    #[test]
    fn test_zero_previous_cost_does_not_divide() {
        let features = extract_cost_features(&series(&[0.0, 0.0, 50.0, 60.0])).unwrap();
        assert!(features.iter().all(|f| f.pct_change.is_finite()));
        assert!((features[3].pct_change - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_calendar_fields() {
        // 2024-01-06 is a Saturday
        let obs = vec![CostObservation::new(
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            10.0,
        )];
        let f = &extract_cost_features(&obs).unwrap()[0];
        assert_eq!(f.day_of_week, 5);
        assert!(f.is_weekend);
        assert_eq!(f.day_of_month, 6);
        assert_eq!(f.month, 1);
        assert_eq!(f.year, 2024);
    }

    #[test]
    fn test_lookback_window_relative_to_max_date() {
        let costs: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let matrix = prepare_anomaly_feature_matrix(&series(&costs), 30).unwrap();

        // Inclusive cutoff: max_date - 30 days .. max_date
        assert_eq!(matrix.len(), 31);
        assert_eq!(matrix.rows[0].len(), ANOMALY_FEATURE_COUNT);
        assert_eq!(matrix.feature_names()[5], "z_score");
        assert_eq!(matrix.rows[30][0], 219.0);
    }

    #[test]
    fn test_empty_series() {
        assert!(extract_cost_features(&[]).unwrap().is_empty());
        assert!(prepare_anomaly_feature_matrix(&[], 90).unwrap().is_empty());
    }
}
