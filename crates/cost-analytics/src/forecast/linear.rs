//! Least-squares trend line over elapsed days

use super::types::{ForecastPoint, TrendLabel};
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::features::stats::mean_or_zero;
use crate::series::CostObservation;
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fitted trend line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTrendModel {
    /// Cost change per day
    pub slope: f64,
    /// Cost at the first training day
    pub intercept: f64,
    /// Day index zero
    pub start_date: NaiveDate,
    /// Last training day
    pub end_date: NaiveDate,
}

impl LinearTrendModel {
    /// Fit on date-ordered daily totals
    pub fn fit(daily: &[CostObservation]) -> CostAnalyticsResult<Self> {
        let (first, last) = match (daily.first(), daily.last()) {
            (Some(first), Some(last)) if daily.len() >= 2 => (first, last),
            _ => {
                return Err(CostAnalyticsError::InsufficientData {
                    required: 2,
                    actual: daily.len(),
                })
            }
        };

        let x: Vec<f64> = daily
            .iter()
            .map(|o| (o.date - first.date).num_days() as f64)
            .collect();
        let y: Vec<f64> = daily.iter().map(|o| o.cost).collect();

        let x_mean = mean_or_zero(&x);
        let y_mean = mean_or_zero(&y);
        let (covariance, variance) = x.iter().zip(&y).fold((0.0, 0.0), |(cov, var), (xi, yi)| {
            (cov + (xi - x_mean) * (yi - y_mean), var + (xi - x_mean).powi(2))
        });

        if variance <= 0.0 {
            return Err(CostAnalyticsError::CalculationError {
                details: "trend fit needs at least two distinct days".to_string(),
            });
        }

        let slope = covariance / variance;
        Ok(Self {
            slope,
            intercept: y_mean - slope * x_mean,
            start_date: first.date,
            end_date: last.date,
        })
    }

    /// Prediction for a day, floored at zero
    pub fn predict_at(&self, date: NaiveDate) -> f64 {
        let x = (date - self.start_date).num_days() as f64;
        (self.intercept + self.slope * x).max(0.0)
    }

    /// Extrapolate `periods` days past the training range with a symmetric band
    pub fn forecast(&self, periods: usize, band: f64) -> Vec<ForecastPoint> {
        let trend = if self.slope > 0.0 {
            TrendLabel::Increasing
        } else {
            TrendLabel::Decreasing
        };

        (1..=periods)
            .map(|step| {
                let date = self.end_date + ChronoDuration::days(step as i64);
                let predicted = self.predict_at(date);
                ForecastPoint {
                    date,
                    predicted_cost: predicted,
                    confidence_lower: (predicted * (1.0 - band)).max(0.0),
                    confidence_upper: predicted * (1.0 + band),
                    trend,
                }
            })
            .collect()
    }
}
