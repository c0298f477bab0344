//! Per-feature standardization fitted at train time and replayed at detect time

use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaling with statistics frozen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean
    pub mean: Vec<f64>,
    /// Per-feature population standard deviation; 1.0 where a feature was constant
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data
    pub fn fit<const N: usize>(rows: &[[f64; N]]) -> CostAnalyticsResult<Self> {
        if rows.is_empty() {
            return Err(CostAnalyticsError::CalculationError {
                details: "cannot fit scaler on an empty matrix".to_string(),
            });
        }

        let count = rows.len() as f64;
        let mut mean = vec![0.0; N];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= count);

        let mut scale = vec![0.0; N];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        let scale = scale
            .into_iter()
            .map(|s| {
                let std = (s / count).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Apply the stored statistics
    pub fn transform<const N: usize>(&self, rows: &[[f64; N]]) -> CostAnalyticsResult<Vec<Vec<f64>>> {
        if N != self.n_features() {
            return Err(CostAnalyticsError::CalculationError {
                details: format!(
                    "scaler fitted on {} features, got {}",
                    self.n_features(),
                    N
                ),
            });
        }

        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect())
    }
}
