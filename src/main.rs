//! Hivesight CLI
//!
//! Runs the analysis core over an exported observation log:
//! - Generate a report for the latest observation
//! - Forecast the coming week
//! - Print the default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hivesight::config::generate_default_config;
use hivesight::{
    Clock, Config, EnvironmentalReading, HiveCore, LoggingConfig, ManualClock, Observation,
    ObservationCsvImporter, SystemClock, HUMIDITY, RAINFALL, TEMPERATURE, WATER_DISTANCE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hivesight")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trend, correlation and recommendation analysis for beehives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a report from a CSV observation log
    ///
    /// Every row but the last is recorded as history; the last row is the
    /// current observation the report is built around.
    Report {
        /// Hive or user id
        #[arg(short, long)]
        user: String,
        /// Path to CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Current temperature (Celsius)
        #[arg(long)]
        temperature: Option<f64>,
        /// Current relative humidity (percent)
        #[arg(long)]
        humidity: Option<f64>,
        /// Current rainfall (mm)
        #[arg(long)]
        rainfall: Option<f64>,
        /// Current weather condition (e.g. clear_sky)
        #[arg(long)]
        weather: Option<String>,
        /// Use the wall clock instead of the log's latest timestamp
        #[arg(long)]
        live: bool,
    },

    /// Forecast the coming week from a CSV observation log
    Forecast {
        /// Hive or user id
        #[arg(short, long)]
        user: String,
        /// Path to CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Use the wall clock instead of the log's latest timestamp
        #[arg(long)]
        live: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }

        Commands::Report {
            user,
            csv,
            temperature,
            humidity,
            rainfall,
            weather,
            live,
        } => {
            let mut observations = import(&user, &csv)?;
            let Some(current) = observations.pop() else {
                bail!("{:?} contains no observations", csv);
            };

            let core = build_core(config, current.timestamp, live)?;
            for observation in observations {
                core.record(observation)?;
            }

            // Flags override the readings in the log
            let logged = |name: &str| current.environmental.get(name).copied();
            let environment = EnvironmentalReading {
                temperature: temperature.or_else(|| logged(TEMPERATURE)),
                humidity: humidity.or_else(|| logged(HUMIDITY)),
                rainfall: rainfall.or_else(|| logged(RAINFALL)),
                water_distance: logged(WATER_DISTANCE),
                weather_condition: weather,
            };

            let report = core.generate_report(&user, current.metrics, None, Some(&environment))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Forecast { user, csv, live } => {
            let observations = import(&user, &csv)?;
            let Some(latest) = observations.iter().map(|obs| obs.timestamp).max() else {
                bail!("{:?} contains no observations", csv);
            };

            let core = build_core(config, latest, live)?;
            for observation in observations {
                core.record(observation)?;
            }

            let forecast = core.get_forecast(&user)?;
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hivesight={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the JSON output, logs go to stderr
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Read the log, ordered by timestamp
fn import(user: &str, path: &Path) -> anyhow::Result<Vec<Observation>> {
    let result = ObservationCsvImporter::new(user)
        .import(path)
        .with_context(|| format!("importing {:?}", path))?;

    for error in &result.errors {
        tracing::warn!("{}", error);
    }

    let mut observations = result.observations;
    observations.sort_by_key(|obs| obs.timestamp);
    Ok(observations)
}

/// Pin the clock to the end of the log so historical rows stay retained
fn build_core(
    config: Config,
    latest: chrono::DateTime<chrono::Utc>,
    live: bool,
) -> anyhow::Result<HiveCore> {
    let clock: Arc<dyn Clock> = if live {
        Arc::new(SystemClock)
    } else {
        Arc::new(ManualClock::new(latest))
    };
    Ok(HiveCore::new(config, clock)?)
}
