//! End-to-end tests across feature extraction, detection, forecasting and right-sizing

use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use cost_analytics::*;
use std::sync::Arc;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn cost_series(days: usize, cost_at: impl Fn(usize) -> f64) -> Vec<CostObservation> {
    (0..days)
        .map(|i| CostObservation::new(start_date() + ChronoDuration::days(i as i64), cost_at(i)))
        .collect()
}

fn steady(i: usize) -> f64 {
    420.0 + [0.0, 12.0, 15.0, 11.0, 8.0, -25.0, -30.0][i % 7] + ((i * 31) % 11) as f64
}

/// Tests for the anomaly detection workflow
mod anomaly_workflow {
    use super::*;

    #[test]
    fn test_clean_series_low_flag_rate() {
        let observations = cost_series(180, steady);
        let mut detector = CostAnomalyDetector::default();
        detector.train(&observations, 90).unwrap();

        let anomalies = detector.detect(&observations, -0.1).unwrap();
        let window_rows = 91.0;
        assert!(anomalies.len() as f64 <= window_rows * 0.12);
    }

    #[test]
    fn test_ten_x_spike() {
        let observations = cost_series(90, |i| if i == 75 { steady(i) * 10.0 } else { steady(i) });
        let mut detector = CostAnomalyDetector::default();
        detector.train(&observations, 90).unwrap();

        let anomalies = detector.detect(&observations, -0.1).unwrap();
        let spike = anomalies
            .iter()
            .find(|a| a.date == observations[75].date)
            .expect("spike flagged");
        assert_eq!(spike.anomaly_type, AnomalyType::Spike);
        assert!(matches!(
            spike.severity,
            AnomalySeverity::High | AnomalySeverity::Critical
        ));

        let summary = summarize(&anomalies);
        assert_eq!(summary.total_anomalies, anomalies.len());
        assert!(summary.by_type[&AnomalyType::Spike] >= 1);
    }

    #[test]
    fn test_service_tagged_series() {
        let observations: Vec<CostObservation> = (0..60)
            .flat_map(|i| {
                let date = start_date() + ChronoDuration::days(i as i64);
                vec![
                    CostObservation::with_service(date, steady(i as usize) * 0.7, "AmazonEC2"),
                    CostObservation::with_service(date, steady(i as usize) * 0.3, "AmazonS3"),
                ]
            })
            .collect();

        let mut detector = CostAnomalyDetector::default();
        let summary = detector.train(&observations, 90).unwrap();
        assert_eq!(summary.samples, 60);
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let mut observations = cost_series(30, steady);
        observations.push(observations[4].clone());

        let mut detector = CostAnomalyDetector::default();
        let err = detector.train(&observations, 90).unwrap_err();
        assert!(matches!(err, CostAnalyticsError::MalformedSeries { .. }));
    }

    #[test]
    fn test_unordered_input_matches_ordered() {
        let ordered = cost_series(60, steady);
        let mut shuffled = ordered.clone();
        shuffled.reverse();

        let mut a = CostAnomalyDetector::default();
        let mut b = CostAnomalyDetector::default();
        a.train(&ordered, 90).unwrap();
        b.train(&shuffled, 90).unwrap();

        assert_eq!(
            a.detect(&ordered, -0.1).unwrap(),
            b.detect(&shuffled, -0.1).unwrap()
        );
    }

    #[test]
    fn test_persistence_round_trip() {
        let observations = cost_series(120, |i| if i == 100 { 5000.0 } else { steady(i) });
        let mut detector = CostAnomalyDetector::default();
        detector.train(&observations, 90).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");
        detector.save_to_path(&path).unwrap();

        let restored = CostAnomalyDetector::load_from_path(&path).unwrap();
        assert_eq!(
            restored.detect(&observations, -0.1).unwrap(),
            detector.detect(&observations, -0.1).unwrap()
        );

        let later = cost_series(200, |i| if i == 190 { steady(i) * 15.0 } else { steady(i) * 1.5 });
        let expected = detector.detect(&later, -0.1).unwrap();
        assert!(expected.iter().any(|a| a.date == later[190].date));
        assert_eq!(restored.detect(&later, -0.1).unwrap(), expected);
    }
}

/// Tests for the forecasting workflow
mod forecast_workflow {
    use super::*;

    fn linear() -> CostForecaster {
        CostForecaster::new(ForecasterConfig {
            strategy: ForecastStrategy::LinearTrend,
            ..Default::default()
        })
    }

    #[test]
    fn test_forecast_point_count_and_dates() {
        let observations = cost_series(45, steady);
        let mut forecaster = linear();
        forecaster.train(&observations).unwrap();

        let points = forecaster.forecast(30).unwrap();
        assert_eq!(points.len(), 30);
        assert_eq!(points[0].date, start_date() + ChronoDuration::days(45));
        assert!(points.windows(2).all(|w| w[1].date > w[0].date));
        assert!(points.iter().all(|p| p.predicted_cost >= 0.0));
    }

    #[test]
    fn test_summary_total_is_sum() {
        let observations = cost_series(60, steady);
        let mut forecaster = CostForecaster::default();
        forecaster.train(&observations).unwrap();

        let summary = forecaster.get_forecast_summary(28).unwrap();
        let sum: f64 = summary.forecasts.iter().map(|p| p.predicted_cost).sum();
        assert!((summary.total_forecasted_cost - sum).abs() < 0.01);
        assert_eq!(summary.forecasts.len(), 28);
    }

    #[test]
    fn test_untrained_forecaster() {
        let forecaster = CostForecaster::default();
        assert!(matches!(
            forecaster.get_forecast_summary(7).unwrap_err(),
            CostAnalyticsError::ModelNotTrained { .. }
        ));
    }
}

/// Tests for utilization features and right-sizing
mod rightsizing_workflow {
    use super::*;

    fn samples(resource_id: &str, hours: usize, cpu: f64, memory: Option<f64>) -> Vec<MetricSample> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        (0..hours)
            .map(|h| MetricSample {
                resource_id: resource_id.to_string(),
                timestamp: start + ChronoDuration::hours(h as i64),
                cpu_percent: cpu + (h % 5) as f64,
                memory_percent: memory.map(|m| m + (h % 3) as f64),
                network_in: Some(1_000.0 + h as f64),
                network_out: Some(500.0),
            })
            .collect()
    }

    #[test]
    fn test_underutilized_m5_xlarge() {
        let summaries = extract_utilization_features(&samples("i-web", 14 * 24, 10.0, Some(16.0))).unwrap();
        let summary = &summaries[0];
        assert!(summary.p95_cpu() <= 15.0);

        let sizer = RightSizer::default();
        let rec = sizer
            .analyze_instance("i-web", "m5.xlarge", summary)
            .unwrap()
            .expect("recommendation");

        assert!(rec.recommended_size.starts_with("m5."));
        assert_ne!(rec.recommended_size, "m5.xlarge");
        assert!(rec.savings_pct >= 10.0);
        assert!((50..=95).contains(&rec.confidence));
        assert_eq!(rec.risk, RiskLevel::Low);
    }

    #[test]
    fn test_smallest_in_family() {
        let summaries = extract_utilization_features(&samples("i-tiny", 48, 2.0, Some(5.0))).unwrap();
        let sizer = RightSizer::default();
        assert!(sizer
            .analyze_instance("i-tiny", "t3.nano", &summaries[0])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_fleet_from_samples() {
        let mut all = samples("i-a", 72, 12.0, Some(18.0));
        all.extend(samples("i-b", 72, 70.0, None));

        let summaries = extract_utilization_features(&all).unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[1].memory.is_none());

        let resources = vec![
            FleetResource {
                resource_id: "i-a".to_string(),
                instance_size: "c5.2xlarge".to_string(),
            },
            FleetResource {
                resource_id: "i-b".to_string(),
                instance_size: "c5.xlarge".to_string(),
            },
        ];

        let report = RightSizer::default().analyze_fleet(&resources, &summaries).unwrap();
        assert_eq!(report.analyzed, 2);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].resource_id, "i-a");
    }
}

/// Tests for the tenant registry
mod registry_workflow {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_readers_during_retrain() {
        let registry = Arc::new(TenantModelRegistry::default());
        let tenant = TenantId::from("acme");
        let observations = cost_series(90, steady);

        registry.train_detector(&tenant, &observations).unwrap();
        let reader = registry.detector(&tenant).unwrap();

        let summary = registry
            .retrain_detector_blocking(tenant.clone(), cost_series(90, |i| steady(i) * 2.0))
            .await
            .unwrap();

        // The handle taken before the retrain still answers with the old model
        assert_ne!(reader.metadata().unwrap().model_id, summary.model_id);
        assert!(reader.detect_default(&observations).is_ok());
        assert_eq!(
            registry.detector(&tenant).unwrap().metadata().unwrap().model_id,
            summary.model_id
        );
    }
}
