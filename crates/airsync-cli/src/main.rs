use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use time::macros::format_description;
use time::{Date, UtcOffset};
use tracing_subscriber::EnvFilter;

use airsync_core::config::{MAX_POLL_INTERVAL_MINUTES, MIN_POLL_INTERVAL_MINUTES};
use airsync_core::sink::{AlertSink, SinkError, StatusSink};
use airsync_core::{Config, SeriesFetcher, StoreClient, SyncScheduler, Thresholds};
use airsync_types::{Alert, Metric, Reading, Window, timecodec};

#[derive(Parser)]
#[command(name = "airsync")]
#[command(author, version, about = "CLI for the airsync sensor store", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "airsync.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recent reading in the store
    Latest,

    /// Fetch every reading in a date range
    Range {
        /// First day of the range (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// Last day of the range (YYYY-MM-DD), inclusive
        #[arg(short, long)]
        end: String,

        /// Restrict output to one metric (e.g. pm25, pm10, temperature)
        #[arg(short, long)]
        metric: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Poll the store on an interval, printing readings and alerts
    Watch {
        /// Minutes between polls (overrides the configuration file)
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load_validated(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let client = Arc::new(StoreClient::new(&config)?);
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    match cli.command {
        Commands::Latest => {
            // The raw row is displayed directly so one malformed timestamp
            // degrades to the raw string instead of failing the command.
            use airsync_core::client::ReadingStore;
            match client.query_latest().await? {
                Some(row) => println!(
                    "{}  PM2.5 {:>5.1} µg/m³  PM10 {:>5.1} µg/m³  {:>5.1} °C  {:>5.1} %RH",
                    timecodec::display_or_raw(&row.measure_time, offset),
                    row.pm25,
                    row.pm10,
                    row.temperature,
                    row.humidity,
                ),
                None => println!("The store is empty."),
            }
        }
        Commands::Range {
            start,
            end,
            metric,
            format,
        } => {
            let window = parse_window(&start, &end)?;
            let metric = metric.as_deref().map(parse_metric).transpose()?;

            let fetcher = SeriesFetcher::new(Arc::clone(&client), &config);
            let series = fetcher.fetch_range(window).await?;
            if series.skipped() > 0 && !cli.quiet {
                tracing::warn!(skipped = series.skipped(), "some rows could not be parsed");
            }

            match format.as_str() {
                "json" => {
                    let json = serde_json::to_string_pretty(series.readings())?;
                    println!("{json}");
                }
                "text" => {
                    if !cli.quiet {
                        println!("{} readings in {}", series.len(), series.window());
                    }
                    match metric {
                        Some(metric) => {
                            for (at, value) in series.values(metric) {
                                println!(
                                    "{}  {:>8.1} {}",
                                    timecodec::format_display(at, offset),
                                    value,
                                    metric.unit()
                                );
                            }
                        }
                        None => {
                            for reading in series.into_readings() {
                                print_reading(&reading, offset);
                            }
                        }
                    }
                }
                other => anyhow::bail!("unknown format {other:?}, expected text or json"),
            }
        }
        Commands::Watch { interval_minutes } => {
            let minutes =
                validate_interval_minutes(interval_minutes.unwrap_or(config.poll_interval_minutes))?;
            let scheduler = SyncScheduler::new(
                client,
                Thresholds::new(config.thresholds.clone()),
                Arc::new(ConsoleAlertSink),
                Arc::new(ConsoleStatusSink { offset }),
            );
            scheduler.schedule("airsync-watch", Duration::from_secs(minutes * 60));

            if !cli.quiet {
                tracing::info!(minutes, "watching; press Ctrl-C to stop");
            }
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            scheduler.shutdown();
        }
    }

    Ok(())
}

/// Check a watch interval against the same bounds config validation uses,
/// so the command-line override cannot smuggle in a degenerate period.
fn validate_interval_minutes(minutes: u64) -> Result<u64> {
    if !(MIN_POLL_INTERVAL_MINUTES..=MAX_POLL_INTERVAL_MINUTES).contains(&minutes) {
        anyhow::bail!(
            "poll interval must be between {MIN_POLL_INTERVAL_MINUTES} and \
             {MAX_POLL_INTERVAL_MINUTES} minutes, got {minutes}"
        );
    }
    Ok(minutes)
}

fn parse_window(start: &str, end: &str) -> Result<Window> {
    let format = format_description!("[year]-[month]-[day]");
    let start = Date::parse(start, &format)
        .with_context(|| format!("invalid start date {start:?}, expected YYYY-MM-DD"))?;
    let end = Date::parse(end, &format)
        .with_context(|| format!("invalid end date {end:?}, expected YYYY-MM-DD"))?;
    Ok(Window::from_dates(start, end)?)
}

fn parse_metric(name: &str) -> Result<Metric> {
    let metric = match name.to_ascii_lowercase().as_str() {
        "pm25" | "pm2.5" => Metric::Pm25,
        "pm10" => Metric::Pm10,
        "humidity" => Metric::Humidity,
        "humidity-raw" => Metric::HumidityRaw,
        "temperature" => Metric::Temperature,
        "temperature-raw" => Metric::TemperatureRaw,
        "uv" => Metric::Uv,
        "light" => Metric::LightQuantity,
        "pressure" => Metric::AtmosphericPressure,
        other => anyhow::bail!(
            "unknown metric {other:?}, expected one of: pm25, pm10, humidity, \
             humidity-raw, temperature, temperature-raw, uv, light, pressure"
        ),
    };
    Ok(metric)
}

fn print_reading(reading: &Reading, offset: UtcOffset) {
    println!(
        "{}  PM2.5 {:>5.1} µg/m³  PM10 {:>5.1} µg/m³  {:>5.1} °C  {:>5.1} %RH",
        timecodec::format_display(reading.measured_at, offset),
        reading.pm25,
        reading.pm10,
        reading.temperature,
        reading.humidity,
    );
}

struct ConsoleStatusSink {
    offset: UtcOffset,
}

#[async_trait]
impl StatusSink for ConsoleStatusSink {
    async fn display(&self, reading: &Reading) {
        print_reading(reading, self.offset);
    }
}

struct ConsoleAlertSink;

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        println!("ALERT: {}. {}", alert.title, alert.message);
        Ok(())
    }
}
