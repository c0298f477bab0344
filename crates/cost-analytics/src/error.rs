//! Cost analytics error types

use thiserror::Error;

/// Cost analytics error types
#[derive(Debug, Error)]
pub enum CostAnalyticsError {
    /// Not enough history to train a model
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Minimum number of observations
        required: usize,
        /// Observations supplied
        actual: usize,
    },

    /// Inference requested before train or load
    #[error("Model not trained: {model}")]
    ModelNotTrained {
        /// Model that was asked to predict
        model: String,
    },

    /// Instance size missing from the catalog
    #[error("Unknown instance size: {size}")]
    UnknownSize {
        /// Requested size name
        size: String,
    },

    /// Input series rejected before any computation
    #[error("Malformed series: {reason}")]
    MalformedSeries {
        /// What was wrong with the input
        reason: String,
    },

    /// Persisted model bundle written by an incompatible version
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    SnapshotVersion {
        /// Version stored in the bundle
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        /// Offending setting
        message: String,
    },

    /// Numeric failure inside a model
    #[error("Calculation error: {details}")]
    CalculationError {
        /// Failure detail
        details: String,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    IoError {
        /// Underlying error
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error
        #[from]
        source: serde_json::Error,
    },

    /// TOML configuration parse error
    #[error("TOML error: {source}")]
    TomlError {
        /// Underlying error
        #[from]
        source: toml::de::Error,
    },
}

impl CostAnalyticsError {
    /// Shorthand for a malformed series error
    pub fn malformed(reason: impl Into<String>) -> Self {
        CostAnalyticsError::MalformedSeries {
            reason: reason.into(),
        }
    }

    /// Shorthand for a model-not-trained error
    pub fn not_trained(model: impl Into<String>) -> Self {
        CostAnalyticsError::ModelNotTrained {
            model: model.into(),
        }
    }

    /// Whether the caller can recover by supplying more history or training first
    pub fn is_data_shape_error(&self) -> bool {
        matches!(
            self,
            CostAnalyticsError::InsufficientData { .. }
                | CostAnalyticsError::ModelNotTrained { .. }
                | CostAnalyticsError::MalformedSeries { .. }
        )
    }
}

/// Cost analytics result type
pub type CostAnalyticsResult<T> = Result<T, CostAnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_error() {
        let error = CostAnalyticsError::InsufficientData {
            required: 10,
            actual: 4,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 10 observations, got 4"
        );
    }

    #[test]
    fn test_model_not_trained_error() {
        let error = CostAnalyticsError::not_trained("anomaly detector");
        assert_eq!(error.to_string(), "Model not trained: anomaly detector");
    }

    #[test]
    fn test_unknown_size_error() {
        let error = CostAnalyticsError::UnknownSize {
            size: "x9.huge".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown instance size: x9.huge");
    }

    #[test]
    fn test_malformed_series_error() {
        let error = CostAnalyticsError::malformed("duplicate date 2024-01-01");
        assert_eq!(
            error.to_string(),
            "Malformed series: duplicate date 2024-01-01"
        );
    }

    #[test]
    fn test_snapshot_version_error() {
        let error = CostAnalyticsError::SnapshotVersion {
            found: 7,
            expected: 1,
        };
        assert_eq!(
            error.to_string(),
            "Unsupported snapshot version 7, expected 1"
        );
    }

    #[test]
    fn test_data_shape_classification() {
        assert!(CostAnalyticsError::malformed("x").is_data_shape_error());
        assert!(CostAnalyticsError::not_trained("x").is_data_shape_error());
        assert!(CostAnalyticsError::InsufficientData {
            required: 1,
            actual: 0
        }
        .is_data_shape_error());
        assert!(!CostAnalyticsError::ConfigurationError {
            message: "x".to_string()
        }
        .is_data_shape_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "Cannot read model bundle",
        );
        let error = CostAnalyticsError::from(io_error);
        assert!(error.to_string().contains("I/O error"));
        assert!(error.to_string().contains("Cannot read model bundle"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = CostAnalyticsError::from(json_error);
        assert!(error.to_string().contains("JSON error"));
    }

    #[test]
    fn test_error_chaining() {
        fn may_fail() -> CostAnalyticsResult<()> {
            let io_result: Result<(), std::io::Error> = Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "File not found",
            ));
            io_result?;
            Ok(())
        }

        match may_fail().unwrap_err() {
            CostAnalyticsError::IoError { .. } => {}
            other => panic!("Expected IoError variant, got {:?}", other),
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CostAnalyticsError>();
        assert_sync::<CostAnalyticsError>();
    }
}
