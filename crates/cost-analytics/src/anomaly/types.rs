//! Anomaly detection output types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Shape of an anomalous day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// Sudden increase over the previous day
    Spike,
    /// Sudden decrease from the previous day
    Drop,
    /// Outlier without a large day-over-day move
    UnusualPattern,
}

impl AnomalyType {
    /// Classify from the day-over-day percent change
    pub fn from_pct_change(pct_change: f64) -> Self {
        if pct_change > 50.0 {
            AnomalyType::Spike
        } else if pct_change < -30.0 {
            AnomalyType::Drop
        } else {
            AnomalyType::UnusualPattern
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyType::Spike => write!(f, "spike"),
            AnomalyType::Drop => write!(f, "drop"),
            AnomalyType::UnusualPattern => write!(f, "unusual_pattern"),
        }
    }
}

/// Anomaly severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    /// Flagged, but within normal day-over-day movement
    Low,
    /// Worth a look in the next cost review
    Medium,
    /// Large deviation from recent spend
    High,
    /// Extreme deviation, act immediately
    Critical,
}

impl AnomalySeverity {
    /// Grade a flagged day from its decision score and percent change.
    ///
    /// Either signal alone is enough to reach a level.
    pub fn classify(anomaly_score: f64, pct_change: f64) -> Self {
        let magnitude = pct_change.abs();
        if anomaly_score < -0.3 || magnitude > 100.0 {
            AnomalySeverity::Critical
        } else if anomaly_score < -0.2 || magnitude > 50.0 {
            AnomalySeverity::High
        } else if anomaly_score < -0.1 || magnitude > 25.0 {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        }
    }
}

impl std::fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "low"),
            AnomalySeverity::Medium => write!(f, "medium"),
            AnomalySeverity::High => write!(f, "high"),
            AnomalySeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A flagged day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Billing day
    pub date: NaiveDate,
    /// Spend on that day
    pub cost: f64,
    /// Decision score; negative means the ensemble voted outlier
    pub anomaly_score: f64,
    /// Day-over-day change in percent
    pub pct_change: f64,
    /// Shape of the anomaly
    pub anomaly_type: AnomalyType,
    /// Severity
    pub severity: AnomalySeverity,
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Identifier of the trained model
    pub model_id: Uuid,
    /// Rows the model was fitted on
    pub samples: usize,
    /// Training rows the ensemble votes as outliers
    pub anomalies_detected: usize,
    /// anomalies_detected / samples
    pub anomaly_rate: f64,
    /// When training finished
    pub trained_at: DateTime<Utc>,
}

/// Aggregate view over a detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    /// Number of flagged days
    pub total_anomalies: usize,
    /// Count per anomaly type
    pub by_type: BTreeMap<AnomalyType, usize>,
    /// Count per severity
    pub by_severity: BTreeMap<AnomalySeverity, usize>,
    /// Spend on flagged days
    pub anomalous_cost: f64,
    /// Most negative score seen
    pub lowest_score: Option<f64>,
    /// Most recent flagged day
    pub latest_anomaly: Option<NaiveDate>,
}

impl AnomalySummary {
    /// Summarize a set of records
    pub fn from_records(records: &[AnomalyRecord]) -> Self {
        let mut summary = Self {
            total_anomalies: records.len(),
            ..Default::default()
        };

        for record in records {
            *summary.by_type.entry(record.anomaly_type).or_insert(0) += 1;
            *summary.by_severity.entry(record.severity).or_insert(0) += 1;
            summary.anomalous_cost += record.cost;

            summary.lowest_score = Some(match summary.lowest_score {
                Some(s) => s.min(record.anomaly_score),
                None => record.anomaly_score,
            });
            if summary.latest_anomaly.map_or(true, |d| record.date > d) {
                summary.latest_anomaly = Some(record.date);
            }
        }

        summary
    }

    /// Highest severity present
    pub fn worst_severity(&self) -> Option<AnomalySeverity> {
        self.by_severity.keys().next_back().copied()
    }
}

/// Aggregate counts over a detection run
pub fn summarize(records: &[AnomalyRecord]) -> AnomalySummary {
    AnomalySummary::from_records(records)
}
