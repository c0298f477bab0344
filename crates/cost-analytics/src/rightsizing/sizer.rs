//! Utilization-driven instance right-sizing

use super::catalog::{family_of, InstanceCatalog, InstanceSize};
use crate::config::RightSizerConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::features::UtilizationSummary;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const BASE_CONFIDENCE: i32 = 80;
const MIN_CONFIDENCE: i32 = 50;
const MAX_CONFIDENCE: i32 = 95;

/// Risk of running on the recommended size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Ample headroom on the new size
    Low,
    /// Targets run close to the new size's capacity
    Medium,
    /// Current peaks already exceed 80%
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// A downsizing recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRecommendation {
    /// Resource identifier
    pub resource_id: String,
    /// Size the resource runs on today
    pub current_size: String,
    /// Cheapest size in the family that still fits
    pub recommended_size: String,
    /// Monthly price of the current size
    pub current_monthly_cost: f64,
    /// Monthly price of the recommended size
    pub recommended_monthly_cost: f64,
    /// Monthly savings in USD
    pub monthly_savings: f64,
    /// Savings as a percent of the current price
    pub savings_pct: f64,
    /// Risk of the change
    pub risk: RiskLevel,
    /// Confidence score in [50, 95]
    pub confidence: u8,
    /// Human readable explanation
    pub rationale: String,
}

/// A resource and the size it runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetResource {
    /// Resource identifier
    pub resource_id: String,
    /// Current instance size
    pub instance_size: String,
}

/// Right-sizing results across many resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSizingReport {
    /// Recommendations, largest savings first
    pub recommendations: Vec<SizingRecommendation>,
    /// Resources with utilization data that were analyzed
    pub analyzed: usize,
    /// Resources with no utilization summary
    pub missing_utilization: Vec<String>,
    /// Resources whose size is not in the catalog
    pub unknown_sizes: Vec<String>,
    /// Current monthly cost of the resources with a recommendation
    pub total_current_monthly_cost: f64,
    /// Sum of monthly savings
    pub total_monthly_savings: f64,
}

/// Right-sizer over a static catalog
#[derive(Debug, Clone, Default)]
pub struct RightSizer {
    config: RightSizerConfig,
    catalog: InstanceCatalog,
}

impl RightSizer {
    /// Create a right-sizer
    pub fn new(config: RightSizerConfig, catalog: InstanceCatalog) -> Self {
        Self { config, catalog }
    }

    /// Catalog in use
    pub fn catalog(&self) -> &InstanceCatalog {
        &self.catalog
    }

    /// Recommend a cheaper size for one resource.
    ///
    /// Returns `Ok(None)` when the size is unknown, nothing cheaper fits, or the
    /// savings fall below the configured minimum.
    pub fn analyze_instance(
        &self,
        resource_id: &str,
        current_size: &str,
        summary: &UtilizationSummary,
    ) -> CostAnalyticsResult<Option<SizingRecommendation>> {
        let current = match self.catalog.lookup(current_size) {
            Ok(size) => size,
            Err(e) => {
                warn!(resource_id, error = %e, "Skipping right-sizing");
                return Ok(None);
            }
        };

        let p95_cpu = summary.p95_cpu();
        let p95_memory = summary.p95_memory();
        if !p95_cpu.is_finite() || p95_memory.map_or(false, |m| !m.is_finite()) {
            return Err(CostAnalyticsError::malformed(format!(
                "non-finite utilization summary for {}",
                resource_id
            )));
        }

        let target_cpu = p95_cpu * self.config.headroom;
        let target_memory = p95_memory.unwrap_or(p95_cpu) * self.config.headroom;
        let required_vcpu = f64::from(current.vcpu) * target_cpu / 100.0;
        let required_memory = current.memory_gb * target_memory / 100.0;

        let Some((candidate_name, candidate)) =
            self.cheapest_fit(family_of(current_size), required_vcpu, required_memory)
        else {
            debug!(resource_id, current_size, "No size in family meets the requirement");
            return Ok(None);
        };

        if candidate_name == current_size || current.monthly_price <= 0.0 {
            return Ok(None);
        }

        let monthly_savings = current.monthly_price - candidate.monthly_price;
        let savings_pct = monthly_savings / current.monthly_price * 100.0;
        if savings_pct < self.config.min_savings_pct {
            debug!(
                resource_id,
                candidate = candidate_name,
                savings_pct,
                "Savings below threshold"
            );
            return Ok(None);
        }

        let risk = self.risk(p95_cpu, p95_memory, target_cpu, target_memory);
        let confidence = confidence(summary);
        let rationale = format!(
            "Downsize {} from {} to {}: p95 CPU {:.1}%, p95 memory {}, saves ${:.2}/month ({:.1}%)",
            resource_id,
            current_size,
            candidate_name,
            p95_cpu,
            p95_memory.map_or_else(|| "not reported".to_string(), |m| format!("{:.1}%", m)),
            monthly_savings,
            savings_pct
        );

        info!(
            resource_id,
            current_size,
            recommended_size = candidate_name,
            monthly_savings,
            %risk,
            "Right-sizing recommendation"
        );

        Ok(Some(SizingRecommendation {
            resource_id: resource_id.to_string(),
            current_size: current_size.to_string(),
            recommended_size: candidate_name.to_string(),
            current_monthly_cost: current.monthly_price,
            recommended_monthly_cost: candidate.monthly_price,
            monthly_savings,
            savings_pct,
            risk,
            confidence,
            rationale,
        }))
    }

    /// Analyze every resource that has a utilization summary
    pub fn analyze_fleet(
        &self,
        resources: &[FleetResource],
        summaries: &[UtilizationSummary],
    ) -> CostAnalyticsResult<FleetSizingReport> {
        let by_id: HashMap<&str, &UtilizationSummary> = summaries
            .iter()
            .map(|s| (s.resource_id.as_str(), s))
            .collect();

        let mut report = FleetSizingReport::default();
        for resource in resources {
            let Some(summary) = by_id.get(resource.resource_id.as_str()) else {
                report.missing_utilization.push(resource.resource_id.clone());
                continue;
            };
            if self.catalog.get(&resource.instance_size).is_none() {
                report.unknown_sizes.push(resource.resource_id.clone());
            }

            report.analyzed += 1;
            if let Some(rec) =
                self.analyze_instance(&resource.resource_id, &resource.instance_size, summary)?
            {
                report.total_current_monthly_cost += rec.current_monthly_cost;
                report.total_monthly_savings += rec.monthly_savings;
                report.recommendations.push(rec);
            }
        }

        report.recommendations.sort_by(|a, b| {
            OrderedFloat(b.monthly_savings)
                .cmp(&OrderedFloat(a.monthly_savings))
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });

        info!(
            analyzed = report.analyzed,
            recommendations = report.recommendations.len(),
            total_monthly_savings = report.total_monthly_savings,
            "Analyzed fleet"
        );
        Ok(report)
    }

    fn cheapest_fit(
        &self,
        family: &str,
        required_vcpu: f64,
        required_memory: f64,
    ) -> Option<(&str, &InstanceSize)> {
        self.catalog
            .family(family)
            .into_iter()
            .filter(|(_, size)| {
                f64::from(size.vcpu) >= required_vcpu && size.memory_gb >= required_memory
            })
            .min_by(|(a_name, a), (b_name, b)| {
                OrderedFloat(a.monthly_price)
                    .cmp(&OrderedFloat(b.monthly_price))
                    .then_with(|| a_name.cmp(b_name))
            })
    }

    fn risk(
        &self,
        p95_cpu: f64,
        p95_memory: Option<f64>,
        target_cpu: f64,
        target_memory: f64,
    ) -> RiskLevel {
        let high = self.config.high_risk_utilization;
        if p95_cpu > high || p95_memory.map_or(false, |m| m > high) {
            RiskLevel::High
        } else if target_cpu > self.config.medium_risk_target
            || target_memory > self.config.medium_risk_target
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

fn confidence(summary: &UtilizationSummary) -> u8 {
    let mut score = BASE_CONFIDENCE;
    if summary.cpu.std > 20.0 {
        score -= 15;
    }
    if summary.p95_cpu() < 10.0 {
        score -= 10;
    }
    if summary.memory.is_none() {
        score -= 10;
    }
    score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) as u8
}
