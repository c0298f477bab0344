//! Daily cost forecasting
//!
//! Two strategies: an MSTL decomposition with an AutoETS trend (behind the
//! `seasonal` feature) and a least-squares trend line.

pub mod forecaster;
pub mod linear;
#[cfg(feature = "seasonal")]
pub mod seasonal;
pub mod types;

pub use forecaster::CostForecaster;
pub use linear::LinearTrendModel;
#[cfg(feature = "seasonal")]
pub use seasonal::{fill_daily_grid, seasonal_periods, SeasonalModel};
pub use types::{
    ForecastPoint, ForecastStrategy, ForecastSummary, ForecastTrainingSummary, OverallTrend,
    TrendLabel,
};
