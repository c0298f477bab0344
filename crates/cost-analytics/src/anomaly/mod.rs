//! Cost anomaly detection
//!
//! Standardized daily cost features are scored by an isolation forest; flagged
//! days are classified by shape and graded by severity.

pub mod detector;
pub mod isolation_forest;
pub mod scaler;
pub mod types;

pub use detector::{CostAnomalyDetector, DetectorSnapshot, SNAPSHOT_VERSION};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use scaler::StandardScaler;
pub use types::{
    summarize, AnomalyRecord, AnomalySeverity, AnomalySummary, AnomalyType, TrainingSummary,
};
