//! Per-tenant model registry
//!
//! Each tenant owns its own detector and forecaster. Training always builds a
//! fresh instance and then swaps the map entry, so readers holding an `Arc`
//! keep using the previous model until they ask again.

use crate::anomaly::{AnomalyRecord, CostAnomalyDetector, TrainingSummary};
use crate::config::AnalyticsConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::forecast::{CostForecaster, ForecastPoint, ForecastSummary, ForecastTrainingSummary};
use crate::series::CostObservation;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tenant identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// Create a tenant id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Underlying id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Registry activity counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetrics {
    /// Successful detector trainings and loads
    pub detector_trainings: u64,
    /// Successful forecaster trainings
    pub forecaster_trainings: u64,
    /// Training runs that returned an error
    pub training_failures: u64,
    /// Detection calls served
    pub detections: u64,
    /// Forecast calls served
    pub forecasts: u64,
    /// Last successful training of any model
    pub last_trained_at: Option<DateTime<Utc>>,
}

/// Per-tenant detectors and forecasters
pub struct TenantModelRegistry {
    config: Arc<AnalyticsConfig>,
    detectors: DashMap<TenantId, Arc<CostAnomalyDetector>>,
    forecasters: DashMap<TenantId, Arc<CostForecaster>>,
    metrics: Arc<RwLock<RegistryMetrics>>,
}

impl TenantModelRegistry {
    /// Create an empty registry
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config: Arc::new(config),
            detectors: DashMap::new(),
            forecasters: DashMap::new(),
            metrics: Arc::new(RwLock::new(RegistryMetrics::default())),
        }
    }

    /// Shared configuration
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Train a new detector for the tenant and swap it in
    pub fn train_detector(
        &self,
        tenant: &TenantId,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<TrainingSummary> {
        let mut detector = CostAnomalyDetector::new(self.config.anomaly.clone());
        let summary = match detector.train_default(observations) {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics.write().training_failures += 1;
                warn!(%tenant, error = %e, "Detector training failed");
                return Err(e);
            }
        };

        self.detectors.insert(tenant.clone(), Arc::new(detector));
        {
            let mut metrics = self.metrics.write();
            metrics.detector_trainings += 1;
            metrics.last_trained_at = Some(summary.trained_at);
        }

        info!(%tenant, model_id = %summary.model_id, "Swapped in new anomaly detector");
        Ok(summary)
    }

    /// Train a detector on the blocking thread pool
    pub async fn retrain_detector_blocking(
        self: &Arc<Self>,
        tenant: TenantId,
        observations: Vec<CostObservation>,
    ) -> CostAnalyticsResult<TrainingSummary> {
        let registry = Arc::clone(self);
        tokio::task::spawn_blocking(move || registry.train_detector(&tenant, &observations))
            .await
            .map_err(|e| CostAnalyticsError::CalculationError {
                details: format!("retraining task failed: {}", e),
            })?
    }

    /// Install a detector restored from saved bytes
    pub fn load_detector(&self, tenant: &TenantId, bytes: &[u8]) -> CostAnalyticsResult<()> {
        let detector = CostAnomalyDetector::load(bytes)?;
        self.detectors.insert(tenant.clone(), Arc::new(detector));
        self.metrics.write().detector_trainings += 1;
        debug!(%tenant, "Loaded anomaly detector");
        Ok(())
    }

    /// Current detector of a tenant
    pub fn detector(&self, tenant: &TenantId) -> Option<Arc<CostAnomalyDetector>> {
        self.detectors.get(tenant).map(|entry| Arc::clone(entry.value()))
    }

    /// Run detection with the tenant's current detector
    pub fn detect(
        &self,
        tenant: &TenantId,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<Vec<AnomalyRecord>> {
        let detector = self.detector(tenant).ok_or_else(|| {
            CostAnalyticsError::not_trained(format!("anomaly detector for tenant {}", tenant))
        })?;
        let records = detector.detect_default(observations)?;
        self.metrics.write().detections += 1;
        Ok(records)
    }

    /// Train a new forecaster for the tenant and swap it in
    pub fn train_forecaster(
        &self,
        tenant: &TenantId,
        observations: &[CostObservation],
    ) -> CostAnalyticsResult<ForecastTrainingSummary> {
        let mut forecaster = CostForecaster::new(self.config.forecast.clone());
        let summary = match forecaster.train(observations) {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics.write().training_failures += 1;
                warn!(%tenant, error = %e, "Forecaster training failed");
                return Err(e);
            }
        };

        self.forecasters.insert(tenant.clone(), Arc::new(forecaster));
        {
            let mut metrics = self.metrics.write();
            metrics.forecaster_trainings += 1;
            metrics.last_trained_at = Some(summary.trained_at);
        }

        info!(%tenant, model = %summary.model, "Swapped in new cost forecaster");
        Ok(summary)
    }

    /// Current forecaster of a tenant
    pub fn forecaster(&self, tenant: &TenantId) -> Option<Arc<CostForecaster>> {
        self.forecasters
            .get(tenant)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Forecast with the tenant's current forecaster
    pub fn forecast(
        &self,
        tenant: &TenantId,
        periods: usize,
    ) -> CostAnalyticsResult<Vec<ForecastPoint>> {
        let points = self.require_forecaster(tenant)?.forecast(periods)?;
        self.metrics.write().forecasts += 1;
        Ok(points)
    }

    /// Forecast summary with the tenant's current forecaster
    pub fn forecast_summary(
        &self,
        tenant: &TenantId,
        periods: usize,
    ) -> CostAnalyticsResult<ForecastSummary> {
        let summary = self.require_forecaster(tenant)?.get_forecast_summary(periods)?;
        self.metrics.write().forecasts += 1;
        Ok(summary)
    }

    fn require_forecaster(&self, tenant: &TenantId) -> CostAnalyticsResult<Arc<CostForecaster>> {
        self.forecaster(tenant).ok_or_else(|| {
            CostAnalyticsError::not_trained(format!("cost forecaster for tenant {}", tenant))
        })
    }

    /// Drop every model of a tenant, returning whether any existed
    pub fn remove_tenant(&self, tenant: &TenantId) -> bool {
        let detector = self.detectors.remove(tenant).is_some();
        let forecaster = self.forecasters.remove(tenant).is_some();
        if detector || forecaster {
            info!(%tenant, "Removed tenant models");
        }
        detector || forecaster
    }

    /// Tenants with at least one model, sorted
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .detectors
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.forecasters.iter().map(|entry| entry.key().clone()))
            .collect();
        tenants.sort();
        tenants.dedup();
        tenants
    }

    /// Snapshot of the activity counters
    pub fn metrics(&self) -> RegistryMetrics {
        self.metrics.read().clone()
    }
}

impl Default for TenantModelRegistry {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}
