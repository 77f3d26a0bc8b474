//! Collaborator sinks for alerts and status display.
//!
//! The engine does not render anything and does not register notification
//! channels; it hands results to these seams. Delivery is permission-gated
//! at the sink boundary: a sink may refuse with [`SinkError::Disallowed`],
//! in which case the scheduler logs the alert and carries on — a refused
//! delivery never propagates as a sync failure.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use airsync_types::{Alert, Reading};

/// Errors a delivery sink can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// Delivery is not permitted (e.g. the user revoked notifications).
    #[error("delivery disallowed by sink")]
    Disallowed,

    /// Delivery was attempted and failed.
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Receives threshold alerts.
///
/// Alerts carry a stable per-metric identity, so an implementation can
/// replace its own most recent instance for that metric without touching
/// other metrics' alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Receives the freshest reading for status display.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn display(&self, reading: &Reading);
}

/// Alert sink that writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        info!(metric = %alert.metric, title = %alert.title, message = %alert.message, "alert");
        Ok(())
    }
}

/// Status sink that writes the latest reading to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

#[async_trait]
impl StatusSink for LogStatusSink {
    async fn display(&self, reading: &Reading) {
        info!(
            measured_at = %airsync_types::timecodec::format_wire(reading.measured_at),
            pm25 = reading.pm25,
            pm10 = reading.pm10,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "latest reading"
        );
    }
}
