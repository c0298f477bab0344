//! Cost analytics for per-tenant cloud spend and resource utilization
//!
//! This crate provides the feature-engineering and model layer for:
//! - Daily cost feature extraction and utilization summaries
//! - Cost anomaly detection with an isolation forest
//! - Daily cost forecasting with seasonal or linear models
//! - Instance right-sizing against a size/price catalog
//! - Per-tenant model isolation with atomic retraining

#![warn(missing_docs)]

pub mod anomaly;
pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod model;
pub mod registry;
pub mod rightsizing;
pub mod series;

pub use config::{AnalyticsConfig, AnomalyDetectorConfig, ForecasterConfig, RightSizerConfig};
pub use error::{CostAnalyticsError, CostAnalyticsResult};
pub use model::{ModelKind, ModelMetadata};
pub use series::{daily_totals, CostObservation, MetricSample};

// Feature extraction
pub use features::{
    extract_cost_features, extract_utilization_features, extract_utilization_features_window,
    prepare_anomaly_feature_matrix, AnomalyFeatureMatrix, FeatureVector, MetricStats,
    UtilizationSummary,
};

// Anomaly detection
pub use anomaly::{
    summarize, AnomalyRecord, AnomalySeverity, AnomalySummary, AnomalyType, CostAnomalyDetector,
    DetectorSnapshot, TrainingSummary,
};

// Forecasting
pub use forecast::{
    CostForecaster, ForecastPoint, ForecastStrategy, ForecastSummary, ForecastTrainingSummary,
    OverallTrend, TrendLabel,
};

// Right-sizing
pub use rightsizing::{
    FleetResource, FleetSizingReport, InstanceCatalog, InstanceSize, RightSizer, RiskLevel,
    SizingRecommendation,
};

// Tenant registry
pub use registry::{RegistryMetrics, TenantId, TenantModelRegistry};
