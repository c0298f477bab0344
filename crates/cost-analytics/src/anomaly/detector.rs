//! Isolation-forest anomaly detector over daily cost features

use super::isolation_forest::IsolationForest;
use super::scaler::StandardScaler;
use super::types::{AnomalyRecord, AnomalySeverity, AnomalyType, TrainingSummary};
use crate::config::AnomalyDetectorConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::features::prepare_anomaly_feature_matrix;
use crate::model::{ModelKind, ModelMetadata};
use crate::series::CostObservation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Current persisted bundle layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Parameters produced by one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedDetector {
    scaler: StandardScaler,
    forest: IsolationForest,
    metadata: ModelMetadata,
}

/// Persisted form of a trained detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    /// Bundle layout version
    pub format_version: u32,
    /// Configuration the detector was built with
    pub config: AnomalyDetectorConfig,
    /// Frozen standardization statistics
    pub scaler: StandardScaler,
    /// Fitted ensemble
    pub forest: IsolationForest,
    /// Training metadata, including feature names
    pub metadata: ModelMetadata,
}

/// Cost anomaly detector
#[derive(Debug, Clone)]
pub struct CostAnomalyDetector {
    config: AnomalyDetectorConfig,
    fitted: Option<FittedDetector>,
}

impl Default for CostAnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyDetectorConfig::default())
    }
}

impl CostAnomalyDetector {
    /// Create an untrained detector
    pub fn new(config: AnomalyDetectorConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Detector configuration
    pub fn config(&self) -> &AnomalyDetectorConfig {
        &self.config
    }

    /// Whether `train` or `load` has succeeded
    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    /// Metadata of the current model
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.fitted.as_ref().map(|f| &f.metadata)
    }

    /// Train over the trailing `lookback_days` of the series.
    ///
    /// On failure the previously trained parameters stay in place.
    pub fn train(
        &mut self,
        observations: &[CostObservation],
        lookback_days: u32,
    ) -> CostAnalyticsResult<TrainingSummary> {
        let required = self.config.min_training_samples;
        if observations.len() < required {
            return Err(CostAnalyticsError::InsufficientData {
                required,
                actual: observations.len(),
            });
        }

        let matrix = prepare_anomaly_feature_matrix(observations, lookback_days)?;
        if matrix.len() < required {
            return Err(CostAnalyticsError::InsufficientData {
                required,
                actual: matrix.len(),
            });
        }

        let scaler = StandardScaler::fit(&matrix.rows)?;
        let scaled = scaler.transform(&matrix.rows)?;
        let forest = IsolationForest::fit(&scaled, self.config.forest_params())?;

        let anomalies_detected = forest.predict(&scaled)?.into_iter().filter(|&v| v).count();
        let metadata = ModelMetadata::new(
            ModelKind::AnomalyDetector,
            matrix.feature_names(),
            matrix.len(),
        );

        let summary = TrainingSummary {
            model_id: metadata.model_id,
            samples: matrix.len(),
            anomalies_detected,
            anomaly_rate: anomalies_detected as f64 / matrix.len() as f64,
            trained_at: metadata.trained_at,
        };

        info!(
            model_id = %summary.model_id,
            samples = summary.samples,
            anomalies = summary.anomalies_detected,
            lookback_days,
            "Trained cost anomaly detector"
        );

        self.fitted = Some(FittedDetector {
            scaler,
            forest,
            metadata,
        });
        Ok(summary)
    }

    /// Train with the configured lookback window
    pub fn train_default(
        &mut self,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<TrainingSummary> {
        self.train(observations, self.config.lookback_days)
    }

    /// Score the trailing detection window and return the flagged days.
    ///
    /// A day is flagged when the ensemble votes it an outlier or its score is
    /// below `score_threshold`.
    pub fn detect(
        &self,
        observations: &[CostObservation],
        score_threshold: f64,
    ) -> CostAnalyticsResult<Vec<AnomalyRecord>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| CostAnalyticsError::not_trained(ModelKind::AnomalyDetector.to_string()))?;

        let matrix = prepare_anomaly_feature_matrix(observations, self.config.detection_window_days)?;
        if matrix.is_empty() {
            return Ok(Vec::new());
        }

        let scaled = fitted.scaler.transform(&matrix.rows)?;
        let scores = fitted.forest.decision_function(&scaled)?;

        let records: Vec<AnomalyRecord> = matrix
            .features
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score < 0.0 || *score < score_threshold)
            .map(|(features, score)| AnomalyRecord {
                date: features.date,
                cost: features.daily_cost,
                anomaly_score: score,
                pct_change: features.pct_change,
                anomaly_type: AnomalyType::from_pct_change(features.pct_change),
                severity: AnomalySeverity::classify(score, features.pct_change),
            })
            .collect();

        info!(
            model_id = %fitted.metadata.model_id,
            rows = matrix.len(),
            anomalies = records.len(),
            "Ran cost anomaly detection"
        );
        Ok(records)
    }

    /// Detect with the configured score threshold
    pub fn detect_default(
        &self,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<Vec<AnomalyRecord>> {
        self.detect(observations, self.config.score_threshold)
    }

    /// Snapshot of the trained state
    pub fn snapshot(&self) -> CostAnalyticsResult<DetectorSnapshot> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| CostAnalyticsError::not_trained(ModelKind::AnomalyDetector.to_string()))?;

        Ok(DetectorSnapshot {
            format_version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            scaler: fitted.scaler.clone(),
            forest: fitted.forest.clone(),
            metadata: fitted.metadata.clone(),
        })
    }

    /// Rebuild a detector from a snapshot
    pub fn from_snapshot(snapshot: DetectorSnapshot) -> CostAnalyticsResult<Self> {
        if snapshot.format_version != SNAPSHOT_VERSION {
            return Err(CostAnalyticsError::SnapshotVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.scaler.n_features() != snapshot.metadata.feature_names.len() {
            return Err(CostAnalyticsError::CalculationError {
                details: format!(
                    "snapshot scaler has {} features but metadata lists {}",
                    snapshot.scaler.n_features(),
                    snapshot.metadata.feature_names.len()
                ),
            });
        }

        Ok(Self {
            config: snapshot.config,
            fitted: Some(FittedDetector {
                scaler: snapshot.scaler,
                forest: snapshot.forest,
                metadata: snapshot.metadata,
            }),
        })
    }

    /// Serialize the trained state to JSON bytes
    pub fn save(&self) -> CostAnalyticsResult<Vec<u8>> {
        let bytes = serde_json::to_vec(&self.snapshot()?)?;
        debug!(bytes = bytes.len(), "Serialized anomaly detector");
        Ok(bytes)
    }

    /// Restore a detector saved with [`save`](Self::save)
    pub fn load(bytes: &[u8]) -> CostAnalyticsResult<Self> {
        let snapshot: DetectorSnapshot = serde_json::from_slice(bytes)?;
        Self::from_snapshot(snapshot)
    }

    /// Write the trained state to a file
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> CostAnalyticsResult<()> {
        std::fs::write(path.as_ref(), self.save()?)?;
        info!(path = %path.as_ref().display(), "Saved anomaly detector");
        Ok(())
    }

    /// Read a detector written with [`save_to_path`](Self::save_to_path)
    pub fn load_from_path(path: impl AsRef<Path>) -> CostAnalyticsResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let detector = Self::load(&bytes)?;
        info!(path = %path.as_ref().display(), "Loaded anomaly detector");
        Ok(detector)
    }
}
