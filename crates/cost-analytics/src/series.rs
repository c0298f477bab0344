//! Input series types and validation
//!
//! The retrieval layer hands this crate fully materialized series. Everything
//! here is checked once, up front, so the models never see duplicate dates or
//! non-finite values.

use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One day of spend for a tenant, optionally tagged with a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostObservation {
    /// Billing day
    pub date: NaiveDate,
    /// Spend in USD
    pub cost: f64,
    /// Optional service tag (e.g. "AmazonEC2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl CostObservation {
    /// Untagged daily observation
    pub fn new(date: NaiveDate, cost: f64) -> Self {
        Self {
            date,
            cost,
            service: None,
        }
    }

    /// Observation tagged with a service
    pub fn with_service(date: NaiveDate, cost: f64, service: impl Into<String>) -> Self {
        Self {
            date,
            cost,
            service: Some(service.into()),
        }
    }
}

/// Single utilization sample for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Resource identifier (instance id)
    pub resource_id: String,
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// CPU utilization percent
    pub cpu_percent: f64,
    /// Memory utilization percent, absent without an agent
    #[serde(default)]
    pub memory_percent: Option<f64>,
    /// Network bytes in over the sample period
    #[serde(default)]
    pub network_in: Option<f64>,
    /// Network bytes out over the sample period
    #[serde(default)]
    pub network_out: Option<f64>,
}

/// Validate a cost series and return it sorted by date.
///
/// Unordered input is sorted. Duplicate (date, service) pairs and non-finite or
/// negative costs are rejected.
pub fn validate_cost_series(
    observations: &[CostObservation],
) -> CostAnalyticsResult<Vec<CostObservation>> {
    let mut seen = HashSet::with_capacity(observations.len());

    for obs in observations {
        if !obs.cost.is_finite() {
            return Err(CostAnalyticsError::malformed(format!(
                "non-finite cost on {}",
                obs.date
            )));
        }
        if obs.cost < 0.0 {
            return Err(CostAnalyticsError::malformed(format!(
                "negative cost {:.2} on {}",
                obs.cost, obs.date
            )));
        }
        if !seen.insert((obs.date, obs.service.as_deref())) {
            return Err(CostAnalyticsError::malformed(match &obs.service {
                Some(service) => format!("duplicate date {} for service {}", obs.date, service),
                None => format!("duplicate date {}", obs.date),
            }));
        }
    }

    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.service.cmp(&b.service)));
    Ok(sorted)
}

/// Collapse a (possibly service-tagged) series into one total per day, in date order
pub fn daily_totals(observations: &[CostObservation]) -> CostAnalyticsResult<Vec<CostObservation>> {
    let validated = validate_cost_series(observations)?;

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for obs in &validated {
        *totals.entry(obs.date).or_insert(0.0) += obs.cost;
    }

    Ok(totals
        .into_iter()
        .map(|(date, cost)| CostObservation::new(date, cost))
        .collect())
}

/// Validate utilization samples
pub fn validate_metric_samples(samples: &[MetricSample]) -> CostAnalyticsResult<()> {
    for sample in samples {
        if sample.resource_id.trim().is_empty() {
            return Err(CostAnalyticsError::malformed(format!(
                "empty resource id at {}",
                sample.timestamp
            )));
        }

        let optional = [
            sample.memory_percent,
            sample.network_in,
            sample.network_out,
        ];
        if !sample.cpu_percent.is_finite() || optional.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CostAnalyticsError::malformed(format!(
                "non-finite metric for {} at {}",
                sample.resource_id, sample.timestamp
            )));
        }
    }
    Ok(())
}
