//! Particulate-matter thresholds and alert evaluation.
//!
//! This module maps a reading to zero or more [`Alert`]s based on static
//! per-metric limits. The evaluator is a pure function of the reading: the
//! same breach re-emits an identical alert on every evaluation, with no
//! time-based suppression. Deduplication, if any, is the delivery sink's
//! business — each alert's [`Metric`] identity is stable so a sink can
//! replace its own most recent instance per metric.
//!
//! # Example
//!
//! ```
//! use airsync_core::Thresholds;
//! use airsync_types::{Metric, RawReading, Reading};
//!
//! let thresholds = Thresholds::default();
//! let reading = Reading::try_from(&RawReading {
//!     pm25: 36.0,
//!     measure_time: "2024-03-01T10:00:00".to_string(),
//!     ..RawReading::default()
//! })
//! .unwrap();
//!
//! let alerts = thresholds.evaluate(&reading);
//! assert_eq!(alerts.len(), 1);
//! assert_eq!(alerts[0].metric, Metric::Pm25);
//! ```

use serde::{Deserialize, Serialize};

use airsync_types::{Alert, Metric, Reading};

/// Configuration for particulate-matter thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// PM2.5 limit in µg/m³; strictly exceeding it raises an alert.
    pub pm25_max: f64,
    /// PM10 limit in µg/m³; strictly exceeding it raises an alert.
    pub pm10_max: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            pm25_max: 35.0,
            pm10_max: 50.0,
        }
    }
}

/// Threshold evaluator for sensor readings.
#[derive(Debug, Clone)]
pub struct Thresholds {
    limits: Vec<(Metric, f64)>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

impl Thresholds {
    /// Create an evaluator from the given configuration.
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            limits: vec![(Metric::Pm25, config.pm25_max), (Metric::Pm10, config.pm10_max)],
        }
    }

    /// Create an evaluator over arbitrary per-metric limits.
    pub fn with_limits(limits: Vec<(Metric, f64)>) -> Self {
        Self { limits }
    }

    /// The configured `(metric, limit)` pairs.
    pub fn limits(&self) -> &[(Metric, f64)] {
        &self.limits
    }

    /// Evaluate a reading against every limit.
    ///
    /// One alert per metric iff the value strictly exceeds the limit;
    /// boundary equality raises nothing. Alerts are independent per metric.
    pub fn evaluate(&self, reading: &Reading) -> Vec<Alert> {
        self.limits
            .iter()
            .filter_map(|&(metric, max)| {
                let value = metric.extract(reading);
                (value > max).then(|| Alert {
                    metric,
                    title: format!("High {} level", metric.label()),
                    message: format!(
                        "Air quality is poor. Current value: {:.1} {}.",
                        value,
                        metric.unit()
                    ),
                })
            })
            .collect()
    }

    /// Whether a single metric's value exceeds its limit.
    pub fn exceeds(&self, metric: Metric, value: f64) -> bool {
        self.limits
            .iter()
            .any(|&(m, max)| m == metric && value > max)
    }
}
