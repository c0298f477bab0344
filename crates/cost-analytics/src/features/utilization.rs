//! Per-resource utilization summaries
//!
//! Reduces raw CPU/memory/network samples to the distribution statistics the
//! right-sizer needs. Memory and network telemetry are optional: instances
//! without the CloudWatch agent only report CPU.

use super::stats::{mean_or_zero, percentile, sample_std, sorted, EPSILON};
use crate::error::CostAnalyticsResult;
use crate::series::{validate_metric_samples, MetricSample};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Distribution statistics for a percentage metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Mean value
    pub mean: f64,
    /// Sample standard deviation (0 for a single sample)
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl MetricStats {
    /// Compute statistics over a non-empty slice, `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let ordered = sorted(values);
        Some(Self {
            mean: mean_or_zero(values),
            std: sample_std(values).unwrap_or(0.0),
            min: ordered[0],
            max: ordered[ordered.len() - 1],
            p95: percentile(&ordered, 95.0),
            p99: percentile(&ordered, 99.0),
        })
    }

    /// Mean expressed as a fraction of full capacity
    pub fn utilization_ratio(&self) -> f64 {
        self.mean / 100.0
    }

    /// How far the peak sits above the average
    pub fn peak_to_average(&self) -> f64 {
        self.max / (self.mean + EPSILON)
    }
}

/// Mean and max of a throughput metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    /// Mean bytes per sample period
    pub mean: f64,
    /// Max bytes per sample period
    pub max: f64,
}

impl ThroughputStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            mean: mean_or_zero(values),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Utilization summary for one resource over a lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationSummary {
    /// Resource identifier
    pub resource_id: String,
    /// Samples reduced into this summary
    pub sample_count: usize,
    /// Oldest sample
    pub window_start: Option<DateTime<Utc>>,
    /// Newest sample
    pub window_end: Option<DateTime<Utc>>,
    /// CPU utilization percent
    pub cpu: MetricStats,
    /// Memory utilization percent, when reported
    pub memory: Option<MetricStats>,
    /// Network in, when reported
    pub network_in: Option<ThroughputStats>,
    /// Network out, when reported
    pub network_out: Option<ThroughputStats>,
    /// cpu.mean / 100
    pub cpu_utilization_ratio: f64,
    /// memory.mean / 100
    pub memory_utilization_ratio: Option<f64>,
    /// cpu.max / cpu.mean
    pub cpu_peak_to_average: f64,
    /// memory.max / memory.mean
    pub memory_peak_to_average: Option<f64>,
}

impl UtilizationSummary {
    /// Build a summary from already reduced statistics
    pub fn from_stats(
        resource_id: impl Into<String>,
        cpu: MetricStats,
        memory: Option<MetricStats>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            sample_count: 0,
            window_start: None,
            window_end: None,
            cpu_utilization_ratio: cpu.utilization_ratio(),
            memory_utilization_ratio: memory.as_ref().map(MetricStats::utilization_ratio),
            cpu_peak_to_average: cpu.peak_to_average(),
            memory_peak_to_average: memory.as_ref().map(MetricStats::peak_to_average),
            cpu,
            memory,
            network_in: None,
            network_out: None,
        }
    }

    /// p95 CPU percent
    pub fn p95_cpu(&self) -> f64 {
        self.cpu.p95
    }

    /// p95 memory percent, when reported
    pub fn p95_memory(&self) -> Option<f64> {
        self.memory.map(|m| m.p95)
    }
}

/// Group samples by resource and reduce each group to a [`UtilizationSummary`].
///
/// Summaries are returned ordered by resource id.
pub fn extract_utilization_features(
    samples: &[MetricSample],
) -> CostAnalyticsResult<Vec<UtilizationSummary>> {
    validate_metric_samples(samples)?;

    let mut groups: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.resource_id.as_str())
            .or_default()
            .push(sample);
    }

    let summaries: Vec<UtilizationSummary> = groups
        .into_iter()
        .filter_map(|(resource_id, group)| summarize_group(resource_id, &group))
        .collect();

    debug!(
        resources = summaries.len(),
        samples = samples.len(),
        "Extracted utilization features"
    );
    Ok(summaries)
}

/// Same as [`extract_utilization_features`], restricted to the trailing
/// `lookback_days` before the newest sample.
pub fn extract_utilization_features_window(
    samples: &[MetricSample],
    lookback_days: u32,
) -> CostAnalyticsResult<Vec<UtilizationSummary>> {
    let Some(newest) = samples.iter().map(|s| s.timestamp).max() else {
        return Ok(Vec::new());
    };
    let cutoff = newest - ChronoDuration::days(i64::from(lookback_days));

    let windowed: Vec<MetricSample> = samples
        .iter()
        .filter(|s| s.timestamp >= cutoff)
        .cloned()
        .collect();

    extract_utilization_features(&windowed)
}

fn summarize_group(resource_id: &str, group: &[&MetricSample]) -> Option<UtilizationSummary> {
    let cpu_values: Vec<f64> = group.iter().map(|s| s.cpu_percent).collect();
    let memory_values: Vec<f64> = group.iter().filter_map(|s| s.memory_percent).collect();
    let net_in: Vec<f64> = group.iter().filter_map(|s| s.network_in).collect();
    let net_out: Vec<f64> = group.iter().filter_map(|s| s.network_out).collect();

    let cpu = MetricStats::from_values(&cpu_values)?;
    let memory = MetricStats::from_values(&memory_values);

    let mut summary = UtilizationSummary::from_stats(resource_id, cpu, memory);
    summary.sample_count = group.len();
    summary.window_start = group.iter().map(|s| s.timestamp).min();
    summary.window_end = group.iter().map(|s| s.timestamp).max();
    summary.network_in = ThroughputStats::from_values(&net_in);
    summary.network_out = ThroughputStats::from_values(&net_out);
    Some(summary)
}
