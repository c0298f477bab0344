//! cost-analytics command-line tool
//!
//! Usage:
//!   cost-analytics detect --input costs.json [--summary]
//!   cost-analytics forecast --input costs.json --periods 30
//!   cost-analytics rightsize --inventory resources.json --metrics samples.json

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity; logs go to stderr so stdout stays JSON
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli::load_config(cli.config.as_deref())?;
    tracing::debug!(strategy = %config.forecast.strategy, "Loaded configuration");

    cli.command.execute(config)
}
