//! Feature extraction for cost and utilization series
//!
//! - `cost`: per-day rolling statistics, calendar fields and lags
//! - `utilization`: per-resource distribution summaries
//! - `stats`: shared numeric helpers

pub mod cost;
pub mod stats;
pub mod utilization;

pub use cost::{
    extract_cost_features, prepare_anomaly_feature_matrix, AnomalyFeatureMatrix, FeatureVector,
    ANOMALY_FEATURE_COUNT, ANOMALY_FEATURE_NAMES,
};
pub use stats::percentile;
pub use utilization::{
    extract_utilization_features, extract_utilization_features_window, MetricStats,
    ThroughputStats, UtilizationSummary,
};
