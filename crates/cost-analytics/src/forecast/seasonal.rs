//! MSTL seasonal forecaster with an AutoETS trend

use super::types::{ForecastPoint, TrendLabel};
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::series::CostObservation;
use augurs_core::{Fit, Forecast, Predict};
use augurs_ets::AutoETS;
use augurs_mstl::MSTLModel;
use chrono::{Duration as ChronoDuration, NaiveDate};
use tracing::debug;

/// Weekly seasonal period in days
pub const WEEKLY_PERIOD: usize = 7;
/// Yearly seasonal period in days
pub const YEARLY_PERIOD: usize = 365;

type Predictor = Box<dyn Fn(usize, f64) -> CostAnalyticsResult<Forecast> + Send + Sync>;

/// Fitted seasonal model
pub struct SeasonalModel {
    predictor: Predictor,
    periods: Vec<usize>,
    interval_width: f64,
    /// Contiguous daily training values
    history: Vec<f64>,
    end_date: NaiveDate,
}

impl std::fmt::Debug for SeasonalModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeasonalModel")
            .field("periods", &self.periods)
            .field("interval_width", &self.interval_width)
            .field("history_len", &self.history.len())
            .field("end_date", &self.end_date)
            .finish()
    }
}

impl SeasonalModel {
    /// Fit on date-ordered daily totals.
    ///
    /// Yearly seasonality is only modeled once `yearly_min_days` of history exist.
    pub fn fit(
        daily: &[CostObservation],
        interval_width: f64,
        yearly_min_days: usize,
    ) -> CostAnalyticsResult<Self> {
        let (history, end_date) = fill_daily_grid(daily)?;
        if history.len() < 2 * WEEKLY_PERIOD {
            return Err(CostAnalyticsError::InsufficientData {
                required: 2 * WEEKLY_PERIOD,
                actual: history.len(),
            });
        }

        let periods = seasonal_periods(history.len(), yearly_min_days);

        let trend_model = AutoETS::non_seasonal().into_trend_model();
        let fitted = MSTLModel::new(periods.clone(), trend_model)
            .fit(&history)
            .map_err(|e| CostAnalyticsError::CalculationError {
                details: format!("MSTL fitting failed: {}", e),
            })?;

        debug!(days = history.len(), ?periods, "Fitted seasonal cost model");

        let predictor: Predictor = Box::new(move |horizon, level| {
            fitted
                .predict(horizon, Some(level))
                .map_err(|e| CostAnalyticsError::CalculationError {
                    details: format!("MSTL forecast failed: {}", e),
                })
        });

        Ok(Self {
            predictor,
            periods,
            interval_width,
            history,
            end_date,
        })
    }

    /// Seasonal periods included in the fit
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// Forecast `periods` days past the training range
    pub fn forecast(&self, periods: usize) -> CostAnalyticsResult<Vec<ForecastPoint>> {
        if periods == 0 {
            return Ok(Vec::new());
        }

        let forecast = (self.predictor)(periods, self.interval_width)?;
        let point: Vec<f64> = forecast.point.into_iter().collect();
        let intervals = forecast
            .intervals
            .ok_or_else(|| CostAnalyticsError::CalculationError {
                details: "seasonal forecast returned no intervals".to_string(),
            })?;

        if point.len() != periods || intervals.lower.len() != periods || intervals.upper.len() != periods
        {
            return Err(CostAnalyticsError::CalculationError {
                details: format!(
                    "seasonal forecast returned {} points for {} periods",
                    point.len(),
                    periods
                ),
            });
        }

        let labels = seasonal_trend_labels(&self.history, &point);

        Ok(point
            .iter()
            .zip(intervals.lower.iter().zip(intervals.upper.iter()))
            .zip(labels)
            .enumerate()
            .map(|(step, ((&value, (&lower, &upper)), trend))| ForecastPoint {
                date: self.end_date + ChronoDuration::days(step as i64 + 1),
                predicted_cost: value.max(0.0),
                confidence_lower: lower.max(0.0),
                confidence_upper: upper.max(0.0),
                trend,
            })
            .collect())
    }
}

/// Seasonal periods to decompose for `days` of history.
///
/// MSTL needs two full cycles of a period, so the yearly period joins only
/// once the grid covers two years as well as `yearly_min_days`.
pub fn seasonal_periods(days: usize, yearly_min_days: usize) -> Vec<usize> {
    let mut periods = vec![WEEKLY_PERIOD];
    if days >= yearly_min_days.max(2 * YEARLY_PERIOD) {
        periods.push(YEARLY_PERIOD);
    }
    periods
}

/// Reindex daily totals onto a contiguous day grid.
///
/// Missing interior days are linearly interpolated between their neighbours.
/// Returns the values and the last grid day.
pub fn fill_daily_grid(daily: &[CostObservation]) -> CostAnalyticsResult<(Vec<f64>, NaiveDate)> {
    let (first, last) = match (daily.first(), daily.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(CostAnalyticsError::InsufficientData {
                required: 2,
                actual: 0,
            })
        }
    };

    let mut values = vec![first.cost];
    for window in daily.windows(2) {
        let (prev, next) = (&window[0], &window[1]);
        let gap = (next.date - prev.date).num_days();
        for step in 1..gap {
            let weight = step as f64 / gap as f64;
            values.push(prev.cost + (next.cost - prev.cost) * weight);
        }
        values.push(next.cost);
    }

    Ok((values, last.date))
}

/// Compare each forecast value with the value one week earlier, reaching back
/// into the training history for the first week.
fn seasonal_trend_labels(history: &[f64], forecast: &[f64]) -> Vec<TrendLabel> {
    (0..forecast.len())
        .map(|i| {
            let previous = if i >= WEEKLY_PERIOD {
                Some(forecast[i - WEEKLY_PERIOD])
            } else {
                (history.len() + i)
                    .checked_sub(WEEKLY_PERIOD)
                    .and_then(|idx| history.get(idx).copied())
            };
            match previous {
                Some(prev) if forecast[i] > prev => TrendLabel::Increasing,
                Some(_) => TrendLabel::Decreasing,
                None => TrendLabel::Increasing,
            }
        })
        .collect()
}
