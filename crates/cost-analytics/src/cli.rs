//! Command-line structure and command handlers
//!
//! Every command reads JSON input files and prints a JSON result to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cost_analytics::{
    extract_utilization_features_window, summarize, AnalyticsConfig, CostAnomalyDetector,
    CostForecaster, CostObservation, FleetResource, ForecastStrategy, MetricSample, RightSizer,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Cost anomaly detection, forecasting and right-sizing
#[derive(Parser)]
#[command(name = "cost-analytics")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on a cost series and report anomalous days
    Detect {
        /// JSON array of {date, cost, service?} records
        #[arg(short, long)]
        input: PathBuf,

        /// Training window in days
        #[arg(long)]
        lookback_days: Option<u32>,

        /// Decision score below which a day is flagged
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,

        /// Use a saved detector instead of training
        #[arg(long, conflicts_with = "lookback_days")]
        model: Option<PathBuf>,

        /// Write the trained detector to this path
        #[arg(long)]
        save_model: Option<PathBuf>,

        /// Print aggregate counts instead of individual records
        #[arg(long)]
        summary: bool,
    },

    /// Train on a cost series and forecast future days
    Forecast {
        /// JSON array of {date, cost, service?} records
        #[arg(short, long)]
        input: PathBuf,

        /// Days to forecast
        #[arg(short, long, default_value_t = 30)]
        periods: usize,

        /// Override the configured strategy (seasonal, linear_trend)
        #[arg(long)]
        strategy: Option<ForecastStrategy>,
    },

    /// Recommend cheaper instance sizes from utilization samples
    Rightsize {
        /// JSON array of {resource_id, instance_size} records
        #[arg(long)]
        inventory: PathBuf,

        /// JSON array of utilization samples
        #[arg(long)]
        metrics: PathBuf,

        /// Trailing window of samples to consider
        #[arg(long, default_value_t = 14)]
        lookback_days: u32,
    },
}

impl Commands {
    /// Run the command and print its result
    pub fn execute(self, config: AnalyticsConfig) -> Result<()> {
        match self {
            Commands::Detect {
                input,
                lookback_days,
                threshold,
                model,
                save_model,
                summary,
            } => {
                let observations: Vec<CostObservation> = read_json(&input)?;

                let detector = match model {
                    Some(path) => CostAnomalyDetector::load_from_path(&path)
                        .with_context(|| format!("Failed to load model {}", path.display()))?,
                    None => {
                        let mut detector = CostAnomalyDetector::new(config.anomaly.clone());
                        let lookback = lookback_days.unwrap_or(config.anomaly.lookback_days);
                        detector.train(&observations, lookback)?;
                        detector
                    }
                };

                if let Some(path) = save_model {
                    detector.save_to_path(&path)?;
                }

                let threshold = threshold.unwrap_or(config.anomaly.score_threshold);
                let records = detector.detect(&observations, threshold)?;
                if summary {
                    print_json(&summarize(&records))
                } else {
                    print_json(&records)
                }
            }

            Commands::Forecast {
                input,
                periods,
                strategy,
            } => {
                let observations: Vec<CostObservation> = read_json(&input)?;

                let mut forecast_config = config.forecast.clone();
                if let Some(strategy) = strategy {
                    forecast_config.strategy = strategy;
                }

                let mut forecaster = CostForecaster::new(forecast_config);
                forecaster.train(&observations)?;
                print_json(&forecaster.get_forecast_summary(periods)?)
            }

            Commands::Rightsize {
                inventory,
                metrics,
                lookback_days,
            } => {
                let resources: Vec<FleetResource> = read_json(&inventory)?;
                let samples: Vec<MetricSample> = read_json(&metrics)?;

                let summaries = extract_utilization_features_window(&samples, lookback_days)?;
                let sizer = RightSizer::new(config.rightsizing.clone(), config.catalog.clone());
                print_json(&sizer.analyze_fleet(&resources, &summaries)?)
            }
        }
    }
}

/// Load the configuration file, then apply environment overrides
pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    let mut config = match path {
        Some(path) => AnalyticsConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from([
            "cost-analytics",
            "-vv",
            "detect",
            "--input",
            "costs.json",
            "--threshold",
            "-0.2",
            "--summary",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Detect {
                threshold, summary, ..
            } => {
                assert_eq!(threshold, Some(-0.2));
                assert!(summary);
            }
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn test_parse_forecast_strategy() {
        let cli = Cli::try_parse_from([
            "cost-analytics",
            "forecast",
            "-i",
            "costs.json",
            "--strategy",
            "linear_trend",
        ])
        .unwrap();

        match cli.command {
            Commands::Forecast {
                periods, strategy, ..
            } => {
                assert_eq!(periods, 30);
                assert_eq!(strategy, Some(ForecastStrategy::LinearTrend));
            }
            _ => panic!("expected forecast"),
        }
    }

    #[test]
    fn test_forecast_command_runs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let records: Vec<String> = (1..=20)
            .map(|d| format!(r#"{{"date":"2024-05-{:02}","cost":{}}}"#, d, 100 + d))
            .collect();
        std::io::Write::write_all(&mut file, format!("[{}]", records.join(",")).as_bytes())
            .unwrap();

        let command = Commands::Forecast {
            input: file.path().to_path_buf(),
            periods: 5,
            strategy: Some(ForecastStrategy::LinearTrend),
        };
        assert!(command.execute(AnalyticsConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_input_is_reported() {
        let command = Commands::Forecast {
            input: PathBuf::from("/nonexistent/costs.json"),
            periods: 5,
            strategy: None,
        };
        let err = command.execute(AnalyticsConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
