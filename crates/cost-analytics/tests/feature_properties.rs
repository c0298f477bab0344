//! Property tests for feature extraction

use chrono::{Duration as ChronoDuration, NaiveDate};
use cost_analytics::features::{percentile, ANOMALY_FEATURE_COUNT};
use cost_analytics::{extract_cost_features, prepare_anomaly_feature_matrix, CostObservation};
use proptest::prelude::*;

fn series(costs: &[f64]) -> Vec<CostObservation> {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    costs
        .iter()
        .enumerate()
        .map(|(i, &c)| CostObservation::new(start + ChronoDuration::days(i as i64), c))
        .collect()
}

proptest! {
    #[test]
    fn test_features_always_finite(costs in prop::collection::vec(0.0f64..100_000.0, 1..120)) {
        let features = extract_cost_features(&series(&costs)).unwrap();
        prop_assert_eq!(features.len(), costs.len());

        for f in &features {
            for value in f.anomaly_features() {
                prop_assert!(value.is_finite());
            }
            prop_assert!(f.rolling_mean_30.is_finite());
            prop_assert!(f.rolling_std_30.is_finite());
            prop_assert!(f.lag_30.is_finite());
        }
    }

    #[test]
    fn test_zero_heavy_series_finite(costs in prop::collection::vec(prop_oneof![Just(0.0f64), 0.0f64..10.0], 1..60)) {
        let features = extract_cost_features(&series(&costs)).unwrap();
        prop_assert!(features.iter().all(|f| f.pct_change.is_finite() && f.z_score.is_finite()));
    }

    #[test]
    fn test_window_never_exceeds_lookback(
        costs in prop::collection::vec(1.0f64..1_000.0, 1..200),
        lookback in 1u32..120,
    ) {
        let matrix = prepare_anomaly_feature_matrix(&series(&costs), lookback).unwrap();
        prop_assert!(matrix.len() <= lookback as usize + 1);
        prop_assert!(matrix.len() <= costs.len());
        prop_assert!(matrix.rows.iter().all(|r| r.len() == ANOMALY_FEATURE_COUNT));
        prop_assert_eq!(matrix.rows.last().map(|r| r[0]), costs.last().copied());
    }

    #[test]
    fn test_percentile_bounded(mut values in prop::collection::vec(-1e6f64..1e6, 1..100), p in 0.0f64..=100.0) {
        values.sort_by(|a, b| a.total_cmp(b));
        let q = percentile(&values, p);
        prop_assert!(q >= values[0] - 1e-6 && q <= values[values.len() - 1] + 1e-6);
    }
}

#[test]
fn test_single_row_is_zero_filled() {
    let features = extract_cost_features(&series(&[73.5])).unwrap();
    assert_eq!(features[0].pct_change, 0.0);
    assert_eq!(features[0].lag_1, 0.0);
    assert_eq!(features[0].lag_7, 0.0);
    assert_eq!(features[0].lag_30, 0.0);
}
