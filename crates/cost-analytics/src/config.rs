//! Configuration for the analytics models
//!
//! Every field has a default, so an empty TOML file is a valid configuration.
//! Deployments usually only override the instance catalog and a few
//! thresholds, either in the file or through `COST_ANALYTICS_*` variables.

use crate::anomaly::IsolationForestParams;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::forecast::ForecastStrategy;
use crate::rightsizing::InstanceCatalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Anomaly detector settings
    #[serde(default)]
    pub anomaly: AnomalyDetectorConfig,
    /// Forecaster settings
    #[serde(default)]
    pub forecast: ForecasterConfig,
    /// Right-sizer settings
    #[serde(default)]
    pub rightsizing: RightSizerConfig,
    /// Size/price catalog used by the right-sizer
    #[serde(default)]
    pub catalog: InstanceCatalog,
}

/// Anomaly detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetectorConfig {
    /// Minimum observations accepted by `train`
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,
    /// Training window in days
    #[serde(default = "default_window_days")]
    pub lookback_days: u32,
    /// Maximum window scored by `detect`
    #[serde(default = "default_window_days")]
    pub detection_window_days: u32,
    /// Rows scoring below this are flagged even without an outlier vote
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    /// Trees in the ensemble
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Rows drawn per tree
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Expected outlier fraction
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Sample rows with replacement
    #[serde(default)]
    pub bootstrap: bool,
    /// RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_min_training_samples() -> usize {
    10
}
fn default_window_days() -> u32 {
    90
}
fn default_score_threshold() -> f64 {
    -0.1
}
fn default_n_estimators() -> usize {
    100
}
fn default_max_samples() -> usize {
    256
}
fn default_contamination() -> f64 {
    0.1
}
fn default_seed() -> u64 {
    42
}

impl Default for AnomalyDetectorConfig {
    fn default() -> Self {
        Self {
            min_training_samples: default_min_training_samples(),
            lookback_days: default_window_days(),
            detection_window_days: default_window_days(),
            score_threshold: default_score_threshold(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            contamination: default_contamination(),
            bootstrap: false,
            seed: default_seed(),
        }
    }
}

impl AnomalyDetectorConfig {
    /// Isolation forest hyperparameters
    pub fn forest_params(&self) -> IsolationForestParams {
        IsolationForestParams {
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            contamination: self.contamination,
            bootstrap: self.bootstrap,
            seed: self.seed,
        }
    }
}

/// Forecaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecasterConfig {
    /// Model family, fixed for the lifetime of a forecaster
    #[serde(default)]
    pub strategy: ForecastStrategy,
    /// Prediction interval coverage for the seasonal model
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
    /// History needed before yearly seasonality is modeled
    #[serde(default = "default_yearly_min_days")]
    pub yearly_seasonality_min_days: usize,
    /// Symmetric band around linear predictions, as a fraction
    #[serde(default = "default_linear_band")]
    pub linear_band: f64,
    /// Relative change (percent) between first and last week that counts as a trend
    #[serde(default = "default_trend_threshold_pct")]
    pub summary_trend_threshold_pct: f64,
}

fn default_interval_width() -> f64 {
    0.95
}
fn default_yearly_min_days() -> usize {
    365
}
fn default_linear_band() -> f64 {
    0.10
}
fn default_trend_threshold_pct() -> f64 {
    5.0
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            strategy: ForecastStrategy::default(),
            interval_width: default_interval_width(),
            yearly_seasonality_min_days: default_yearly_min_days(),
            linear_band: default_linear_band(),
            summary_trend_threshold_pct: default_trend_threshold_pct(),
        }
    }
}

/// Right-sizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightSizerConfig {
    /// Multiplier applied to p95 utilization
    #[serde(default = "default_headroom")]
    pub headroom: f64,
    /// Recommendations saving less than this percent are dropped
    #[serde(default = "default_min_savings_pct")]
    pub min_savings_pct: f64,
    /// p95 CPU or memory above this is high risk
    #[serde(default = "default_high_risk_utilization")]
    pub high_risk_utilization: f64,
    /// Headroom-scaled target above this is medium risk
    #[serde(default = "default_medium_risk_target")]
    pub medium_risk_target: f64,
}

fn default_headroom() -> f64 {
    1.2
}
fn default_min_savings_pct() -> f64 {
    10.0
}
fn default_high_risk_utilization() -> f64 {
    80.0
}
fn default_medium_risk_target() -> f64 {
    90.0
}

impl Default for RightSizerConfig {
    fn default() -> Self {
        Self {
            headroom: default_headroom(),
            min_savings_pct: default_min_savings_pct(),
            high_risk_utilization: default_high_risk_utilization(),
            medium_risk_target: default_medium_risk_target(),
        }
    }
}

impl AnalyticsConfig {
    /// Load and validate a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> CostAnalyticsResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.as_ref().display(), "Loaded analytics configuration");
        Ok(config)
    }

    /// Apply `COST_ANALYTICS_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_LOOKBACK_DAYS") {
            self.anomaly.lookback_days = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_DETECTION_WINDOW_DAYS") {
            self.anomaly.detection_window_days = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_SCORE_THRESHOLD") {
            self.anomaly.score_threshold = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_CONTAMINATION") {
            self.anomaly.contamination = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_FORECAST_STRATEGY") {
            self.forecast.strategy = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_INTERVAL_WIDTH") {
            self.forecast.interval_width = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_HEADROOM") {
            self.rightsizing.headroom = v;
        }
        if let Some(v) = parse_value(&lookup, "COST_ANALYTICS_MIN_SAVINGS_PCT") {
            self.rightsizing.min_savings_pct = v;
        }
    }

    /// Reject values the models cannot work with
    pub fn validate(&self) -> CostAnalyticsResult<()> {
        let invalid = |message: String| Err(CostAnalyticsError::ConfigurationError { message });

        if self.anomaly.min_training_samples < 2 {
            return invalid("anomaly.min_training_samples must be at least 2".to_string());
        }
        if self.anomaly.lookback_days == 0 || self.anomaly.detection_window_days == 0 {
            return invalid("anomaly windows must be at least one day".to_string());
        }
        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            return invalid(format!(
                "anomaly.contamination must be in (0, 0.5], got {}",
                self.anomaly.contamination
            ));
        }
        if self.anomaly.n_estimators == 0 || self.anomaly.max_samples == 0 {
            return invalid("anomaly.n_estimators and max_samples must be positive".to_string());
        }
        if !(self.forecast.interval_width > 0.0 && self.forecast.interval_width < 1.0) {
            return invalid(format!(
                "forecast.interval_width must be in (0, 1), got {}",
                self.forecast.interval_width
            ));
        }
        if !(0.0..1.0).contains(&self.forecast.linear_band) {
            return invalid(format!(
                "forecast.linear_band must be in [0, 1), got {}",
                self.forecast.linear_band
            ));
        }
        if self.rightsizing.headroom < 1.0 {
            return invalid(format!(
                "rightsizing.headroom must be at least 1.0, got {}",
                self.rightsizing.headroom
            ));
        }
        if !(0.0..100.0).contains(&self.rightsizing.min_savings_pct) {
            return invalid(format!(
                "rightsizing.min_savings_pct must be in [0, 100), got {}",
                self.rightsizing.min_savings_pct
            ));
        }
        self.catalog.validate()
    }
}

fn parse_value<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable configuration override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.anomaly.min_training_samples, 10);
        assert_eq!(config.anomaly.lookback_days, 90);
        assert_eq!(config.anomaly.score_threshold, -0.1);
        assert_eq!(config.anomaly.n_estimators, 100);
        assert_eq!(config.anomaly.contamination, 0.1);
        assert!(!config.anomaly.bootstrap);
        assert_eq!(config.forecast.interval_width, 0.95);
        assert_eq!(config.rightsizing.headroom, 1.2);
        assert_eq!(config.rightsizing.min_savings_pct, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: AnalyticsConfig = toml::from_str("").unwrap();
        assert_eq!(config.anomaly, AnomalyDetectorConfig::default());
        assert_eq!(config.forecast, ForecasterConfig::default());
        assert!(config.catalog.get("m5.large").is_some());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
            [anomaly]
            lookback_days = 60
            score_threshold = -0.15

            [forecast]
            strategy = "linear_trend"

            [rightsizing]
            min_savings_pct = 20.0
        "#;
        let config: AnalyticsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.anomaly.lookback_days, 60);
        assert_eq!(config.anomaly.score_threshold, -0.15);
        assert_eq!(config.anomaly.n_estimators, 100);
        assert_eq!(config.forecast.strategy, ForecastStrategy::LinearTrend);
        assert_eq!(config.rightsizing.min_savings_pct, 20.0);
        assert_eq!(config.rightsizing.headroom, 1.2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[anomaly]\ncontamination = 0.05").unwrap();

        let config = AnalyticsConfig::load_from(file.path()).unwrap();
        assert_eq!(config.anomaly.contamination, 0.05);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rightsizing]\nheadroom = 0.5").unwrap();

        let err = AnalyticsConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, CostAnalyticsError::ConfigurationError { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COST_ANALYTICS_LOOKBACK_DAYS", "45"),
            ("COST_ANALYTICS_FORECAST_STRATEGY", "linear_trend"),
            ("COST_ANALYTICS_MIN_SAVINGS_PCT", "not-a-number"),
        ]);

        let mut config = AnalyticsConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.anomaly.lookback_days, 45);
        assert_eq!(config.forecast.strategy, ForecastStrategy::LinearTrend);
        // Unparsable values are ignored
        assert_eq!(config.rightsizing.min_savings_pct, 10.0);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AnalyticsConfig::default();
        config.anomaly.contamination = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyticsConfig::default();
        config.forecast.interval_width = 1.0;
        assert!(config.validate().is_err());

        let mut config = AnalyticsConfig::default();
        config.anomaly.lookback_days = 0;
        assert!(config.validate().is_err());
    }
}
