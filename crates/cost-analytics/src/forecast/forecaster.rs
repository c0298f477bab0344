//! Daily cost forecaster

use super::linear::LinearTrendModel;
#[cfg(feature = "seasonal")]
use super::seasonal::SeasonalModel;
use super::types::{
    ForecastPoint, ForecastStrategy, ForecastSummary, ForecastTrainingSummary, OverallTrend,
};
use crate::config::ForecasterConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::features::stats::mean_or_zero;
use crate::model::{ModelKind, ModelMetadata};
use crate::series::{daily_totals, CostObservation};
use tracing::{info, warn};

const SUMMARY_WINDOW: usize = 7;

#[derive(Debug)]
enum FittedModel {
    #[cfg(feature = "seasonal")]
    Seasonal(SeasonalModel),
    Linear(LinearTrendModel),
}

impl FittedModel {
    fn kind(&self) -> ModelKind {
        match self {
            #[cfg(feature = "seasonal")]
            FittedModel::Seasonal(_) => ModelKind::SeasonalForecaster,
            FittedModel::Linear(_) => ModelKind::LinearTrendForecaster,
        }
    }
}

#[derive(Debug)]
struct TrainedForecaster {
    model: FittedModel,
    metadata: ModelMetadata,
}

/// Cost forecaster with a strategy fixed at construction
#[derive(Debug)]
pub struct CostForecaster {
    config: ForecasterConfig,
    strategy: ForecastStrategy,
    trained: Option<TrainedForecaster>,
}

impl Default for CostForecaster {
    fn default() -> Self {
        Self::new(ForecasterConfig::default())
    }
}

impl CostForecaster {
    /// Create an untrained forecaster.
    ///
    /// Without the `seasonal` feature a seasonal strategy resolves to the
    /// linear trend.
    pub fn new(config: ForecasterConfig) -> Self {
        let strategy = resolve_strategy(config.strategy);
        Self {
            config,
            strategy,
            trained: None,
        }
    }

    /// Strategy selected at construction
    pub fn strategy(&self) -> ForecastStrategy {
        self.strategy
    }

    /// Whether `train` has succeeded
    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Model fitted by the last successful training run
    pub fn active_model(&self) -> Option<ModelKind> {
        self.trained.as_ref().map(|t| t.model.kind())
    }

    /// Metadata of the current model
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.trained.as_ref().map(|t| &t.metadata)
    }

    /// Fit on a cost series; service-tagged input is summed per day.
    ///
    /// A seasonal fit that fails falls back to the linear trend for this cycle.
    pub fn train(
        &mut self,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<ForecastTrainingSummary> {
        let daily = daily_totals(observations)?;
        let (start_date, end_date) = match (daily.first(), daily.last()) {
            (Some(first), Some(last)) if daily.len() >= 2 => (first.date, last.date),
            _ => {
                return Err(CostAnalyticsError::InsufficientData {
                    required: 2,
                    actual: daily.len(),
                })
            }
        };

        let model = self.fit_model(&daily)?;
        let metadata = ModelMetadata::new(model.kind(), vec!["daily_cost".to_string()], daily.len());
        let costs: Vec<f64> = daily.iter().map(|o| o.cost).collect();

        let summary = ForecastTrainingSummary {
            model_id: metadata.model_id,
            model: metadata.kind,
            samples: daily.len(),
            start_date,
            end_date,
            average_daily_cost: mean_or_zero(&costs),
            trained_at: metadata.trained_at,
        };

        info!(
            model_id = %summary.model_id,
            model = %summary.model,
            samples = summary.samples,
            %start_date,
            %end_date,
            "Trained cost forecaster"
        );

        self.trained = Some(TrainedForecaster { model, metadata });
        Ok(summary)
    }

    fn fit_model(&self, daily: &[CostObservation]) -> CostAnalyticsResult<FittedModel> {
        if self.strategy == ForecastStrategy::Seasonal {
            if let Some(model) = self.try_fit_seasonal(daily) {
                return Ok(model);
            }
        }
        Ok(FittedModel::Linear(LinearTrendModel::fit(daily)?))
    }

    #[cfg(feature = "seasonal")]
    fn try_fit_seasonal(&self, daily: &[CostObservation]) -> Option<FittedModel> {
        match SeasonalModel::fit(
            daily,
            self.config.interval_width,
            self.config.yearly_seasonality_min_days,
        ) {
            Ok(model) => Some(FittedModel::Seasonal(model)),
            Err(e) => {
                warn!(error = %e, "Seasonal fit failed, falling back to linear trend");
                None
            }
        }
    }

    #[cfg(not(feature = "seasonal"))]
    fn try_fit_seasonal(&self, _daily: &[CostObservation]) -> Option<FittedModel> {
        None
    }

    /// Forecast `periods` consecutive days after the last training day
    pub fn forecast(&self, periods: usize) -> CostAnalyticsResult<Vec<ForecastPoint>> {
        let trained = self
            .trained
            .as_ref()
            .ok_or_else(|| CostAnalyticsError::not_trained(self.strategy.model_kind().to_string()))?;

        let points = match &trained.model {
            #[cfg(feature = "seasonal")]
            FittedModel::Seasonal(model) => model.forecast(periods)?,
            FittedModel::Linear(model) => model.forecast(periods, self.config.linear_band),
        };

        info!(
            model = %trained.model.kind(),
            periods,
            "Generated cost forecast"
        );
        Ok(points)
    }

    /// Forecast with horizon totals and an overall trend
    pub fn get_forecast_summary(&self, periods: usize) -> CostAnalyticsResult<ForecastSummary> {
        let forecasts = self.forecast(periods)?;
        let values: Vec<f64> = forecasts.iter().map(|p| p.predicted_cost).collect();
        let total_forecasted_cost: f64 = values.iter().sum();

        Ok(ForecastSummary {
            total_forecasted_cost,
            average_daily_cost: mean_or_zero(&values),
            trend: overall_trend(&values, self.config.summary_trend_threshold_pct),
            forecasts,
        })
    }
}

fn resolve_strategy(requested: ForecastStrategy) -> ForecastStrategy {
    if cfg!(feature = "seasonal") || requested == ForecastStrategy::LinearTrend {
        requested
    } else {
        warn!("Built without seasonal support, using linear trend forecaster");
        ForecastStrategy::LinearTrend
    }
}

/// Compare the mean of the first week of values with the last week
fn overall_trend(values: &[f64], threshold_pct: f64) -> OverallTrend {
    let window = SUMMARY_WINDOW.min(values.len());
    if window == 0 {
        return OverallTrend::Stable;
    }

    let first = mean_or_zero(&values[..window]);
    let last = mean_or_zero(&values[values.len() - window..]);

    if first <= 0.0 {
        return if last > 0.0 {
            OverallTrend::Increasing
        } else {
            OverallTrend::Stable
        };
    }

    let change_pct = (last - first) / first * 100.0;
    if change_pct > threshold_pct {
        OverallTrend::Increasing
    } else if change_pct < -threshold_pct {
        OverallTrend::Decreasing
    } else {
        OverallTrend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    fn series(days: usize, cost_at: impl Fn(usize) -> f64) -> Vec<CostObservation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..days)
            .map(|i| CostObservation::new(start + ChronoDuration::days(i as i64), cost_at(i)))
            .collect()
    }

    fn linear_config() -> ForecasterConfig {
        ForecasterConfig {
            strategy: ForecastStrategy::LinearTrend,
            ..Default::default()
        }
    }

    #[test]
    fn test_overall_trend() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 2.0).collect();
        assert_eq!(overall_trend(&rising, 5.0), OverallTrend::Increasing);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(overall_trend(&falling, 5.0), OverallTrend::Decreasing);

        assert_eq!(overall_trend(&[100.0; 30], 5.0), OverallTrend::Stable);
        assert_eq!(overall_trend(&[], 5.0), OverallTrend::Stable);
    }

    #[test]
    fn test_forecast_before_train() {
        let forecaster = CostForecaster::default();
        let err = forecaster.forecast(7).unwrap_err();
        assert!(matches!(err, CostAnalyticsError::ModelNotTrained { .. }));
        assert!(forecaster.get_forecast_summary(7).is_err());
    }

    #[test]
    fn test_linear_forecast_dates_and_floor() {
        let observations = series(30, |i| 300.0 - i as f64 * 10.0);
        let mut forecaster = CostForecaster::new(linear_config());
        let summary = forecaster.train(&observations).unwrap();
        assert_eq!(summary.model, ModelKind::LinearTrendForecaster);
        assert_eq!(summary.samples, 30);

        let points = forecaster.forecast(10).unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0].date, summary.end_date + ChronoDuration::days(1));
        for pair in points.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, ChronoDuration::days(1));
        }
        assert!(points.iter().all(|p| p.predicted_cost >= 0.0));
    }

    #[test]
    fn test_summary_totals() {
        let observations = series(60, |i| 100.0 + i as f64);
        let mut forecaster = CostForecaster::new(linear_config());
        forecaster.train(&observations).unwrap();

        let summary = forecaster.get_forecast_summary(30).unwrap();
        let sum: f64 = summary.forecasts.iter().map(|p| p.predicted_cost).sum();
        assert!((summary.total_forecasted_cost - sum).abs() < 0.01);
        assert!((summary.average_daily_cost - sum / 30.0).abs() < 0.01);
        assert_eq!(summary.trend, OverallTrend::Increasing);
    }

    #[test]
    fn test_insufficient_history() {
        let mut forecaster = CostForecaster::new(linear_config());
        let err = forecaster.train(&series(1, |_| 10.0)).unwrap_err();
        assert!(matches!(
            err,
            CostAnalyticsError::InsufficientData {
                required: 2,
                actual: 1
            }
        ));
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn test_seasonal_strategy() {
        let observations = series(120, |i| {
            let weekly = [0.0, 6.0, 9.0, 7.0, 3.0, -11.0, -14.0][i % 7];
            150.0 + i as f64 * 0.4 + weekly
        });
        let mut forecaster = CostForecaster::default();
        let summary = forecaster.train(&observations).unwrap();
        assert_eq!(summary.model, ModelKind::SeasonalForecaster);

        let points = forecaster.forecast(21).unwrap();
        assert_eq!(points.len(), 21);
        assert_eq!(points[0].date, summary.end_date + ChronoDuration::days(1));
        assert!(points.iter().all(|p| p.predicted_cost >= 0.0));
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn test_seasonal_strategy_over_long_history() {
        let weekly = |i: usize| [0.0, 6.0, 9.0, 7.0, 3.0, -11.0, -14.0][i % 7];

        for days in [400, 800] {
            let mut forecaster = CostForecaster::default();
            let summary = forecaster
                .train(&series(days, |i| 150.0 + i as f64 * 0.1 + weekly(i)))
                .unwrap();
            assert_eq!(summary.model, ModelKind::SeasonalForecaster, "days={}", days);
            assert_eq!(forecaster.forecast(30).unwrap().len(), 30);
        }
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn test_seasonal_fallback_on_short_history() {
        let mut forecaster = CostForecaster::default();
        let summary = forecaster.train(&series(3, |i| 10.0 + i as f64)).unwrap();

        assert_eq!(forecaster.strategy(), ForecastStrategy::Seasonal);
        assert_eq!(summary.model, ModelKind::LinearTrendForecaster);
        assert_eq!(forecaster.forecast(5).unwrap().len(), 5);
    }
}
