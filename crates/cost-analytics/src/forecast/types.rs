//! Forecast data types

use crate::error::CostAnalyticsError;
use crate::model::ModelKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Model family used by a forecaster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStrategy {
    /// MSTL decomposition with an AutoETS trend
    #[default]
    Seasonal,
    /// Least-squares trend line
    LinearTrend,
}

impl ForecastStrategy {
    /// Model kind produced when this strategy trains successfully
    pub fn model_kind(self) -> ModelKind {
        match self {
            ForecastStrategy::Seasonal => ModelKind::SeasonalForecaster,
            ForecastStrategy::LinearTrend => ModelKind::LinearTrendForecaster,
        }
    }
}

impl std::fmt::Display for ForecastStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastStrategy::Seasonal => write!(f, "seasonal"),
            ForecastStrategy::LinearTrend => write!(f, "linear_trend"),
        }
    }
}

impl FromStr for ForecastStrategy {
    type Err = CostAnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "seasonal" => Ok(ForecastStrategy::Seasonal),
            "linear_trend" | "linear" => Ok(ForecastStrategy::LinearTrend),
            other => Err(CostAnalyticsError::ConfigurationError {
                message: format!("unknown forecast strategy: {}", other),
            }),
        }
    }
}

/// Direction of a single forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    /// Cost rising
    Increasing,
    /// Cost flat or falling
    Decreasing,
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendLabel::Increasing => write!(f, "increasing"),
            TrendLabel::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Direction of a whole forecast horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallTrend {
    /// Last week averages above the first by more than the threshold
    Increasing,
    /// Last week averages below the first by more than the threshold
    Decreasing,
    /// Within the threshold either way
    Stable,
}

impl std::fmt::Display for OverallTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallTrend::Increasing => write!(f, "increasing"),
            OverallTrend::Decreasing => write!(f, "decreasing"),
            OverallTrend::Stable => write!(f, "stable"),
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecast day
    pub date: NaiveDate,
    /// Point prediction, never negative
    pub predicted_cost: f64,
    /// Lower bound of the prediction interval
    pub confidence_lower: f64,
    /// Upper bound of the prediction interval
    pub confidence_upper: f64,
    /// Step direction
    pub trend: TrendLabel,
}

/// Forecast horizon with totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    /// Per-day forecasts
    pub forecasts: Vec<ForecastPoint>,
    /// Sum of point predictions
    pub total_forecasted_cost: f64,
    /// Mean point prediction
    pub average_daily_cost: f64,
    /// First week against last week
    pub trend: OverallTrend,
}

/// Result of a forecaster training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTrainingSummary {
    /// Identifier of the trained model
    pub model_id: Uuid,
    /// Model actually fitted; differs from the strategy after a fallback
    pub model: ModelKind,
    /// Daily totals the model was fitted on
    pub samples: usize,
    /// First training day
    pub start_date: NaiveDate,
    /// Last training day
    pub end_date: NaiveDate,
    /// Mean daily cost over the training range
    pub average_daily_cost: f64,
    /// When training finished
    pub trained_at: DateTime<Utc>,
}
