//! Core sync engine for a remote air-quality sensor store.
//!
//! This crate talks to a Supabase-backed table of particulate-matter sensor
//! readings and turns it into complete, ordered time series plus a periodic
//! background sync with threshold alerts.
//!
//! # Features
//!
//! - **Windowed history**: Paginated fetch of every reading in a time window
//! - **Latest reading**: Single-row poll of the most recent measurement
//! - **Background sync**: Fixed-interval scheduler with replace-on-register identities
//! - **Threshold alerts**: PM2.5 / PM10 limit evaluation on every synced reading
//! - **Cancellation**: Cooperative cancellation and stale-result detection for in-flight fetches
//! - **Mock store**: In-memory [`ReadingStore`] with failure injection for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use airsync_core::{Config, SeriesFetcher, StoreClient};
//! use airsync_types::{Metric, Window};
//! use time::macros::datetime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("airsync.toml")?;
//!     let client = Arc::new(StoreClient::new(&config)?);
//!     let fetcher = SeriesFetcher::new(client, &config);
//!
//!     let window = Window::new(
//!         datetime!(2024-03-01 00:00:00 UTC),
//!         datetime!(2024-03-07 23:59:59 UTC),
//!     )?;
//!     let series = fetcher.fetch_range(window).await?;
//!
//!     for (at, value) in series.values(Metric::Pm25) {
//!         println!("{at}: {value} µg/m³");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod scheduler;
pub mod series;
pub mod sink;
pub mod thresholds;

// Re-export the shared types crate under its module names.
pub use airsync_types::types;

// Core exports
pub use client::{ReadingStore, StoreClient};
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use scheduler::SyncScheduler;
pub use series::{SeriesFetcher, TimeSeries};
pub use sink::{AlertSink, SinkError, StatusSink};
pub use thresholds::{ThresholdConfig, Thresholds};
