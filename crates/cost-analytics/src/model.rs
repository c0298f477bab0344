//! Model bookkeeping shared by the detector and the forecaster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which model a piece of state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Isolation forest over daily cost features
    AnomalyDetector,
    /// MSTL decomposition with an ETS trend
    SeasonalForecaster,
    /// Least-squares trend line
    LinearTrendForecaster,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::AnomalyDetector => write!(f, "anomaly detector"),
            ModelKind::SeasonalForecaster => write!(f, "seasonal forecaster"),
            ModelKind::LinearTrendForecaster => write!(f, "linear trend forecaster"),
        }
    }
}

/// Metadata recorded whenever a model is trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Identifier of this training run
    pub model_id: Uuid,
    /// Model family
    pub kind: ModelKind,
    /// When training finished
    pub trained_at: DateTime<Utc>,
    /// Input columns in the order the model expects them
    pub feature_names: Vec<String>,
    /// Rows the model was fitted on
    pub training_samples: usize,
}

impl ModelMetadata {
    /// Metadata for a run that finished now
    pub fn new(kind: ModelKind, feature_names: Vec<String>, training_samples: usize) -> Self {
        Self {
            model_id: Uuid::new_v4(),
            kind,
            trained_at: Utc::now(),
            feature_names,
            training_samples,
        }
    }
}
