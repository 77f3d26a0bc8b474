//! Core types for remote sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use time::{Date, OffsetDateTime, Time};

use crate::error::ParseError;
use crate::timecodec;

/// A raw row as served by the remote store's REST endpoint.
///
/// Field names follow the store's column names. Numeric fields default to 0
/// and string fields to the empty string when absent, matching the source
/// data's sparseness.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawReading {
    #[cfg_attr(feature = "serde", serde(rename = "PM25"))]
    pub pm25: f64,
    #[cfg_attr(feature = "serde", serde(rename = "PM10"))]
    pub pm10: f64,
    #[cfg_attr(feature = "serde", serde(rename = "ID"))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "Humidity"))]
    pub humidity: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Humidity_raw"))]
    pub humidity_raw: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Temperature"))]
    pub temperature: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Temperature_raw"))]
    pub temperature_raw: f64,
    #[cfg_attr(feature = "serde", serde(rename = "UV"))]
    pub uv: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Light_quantity"))]
    pub light_quantity: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Atmospheric_pressure"))]
    pub atmospheric_pressure: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Measure_time"))]
    pub measure_time: String,
}

/// One sensor measurement, normalized to a UTC instant.
///
/// `measured_at` is the sole ordering key; `id` may be empty and serves only
/// as a tie-break at page boundaries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Row identifier as assigned by the store. May be empty.
    pub id: String,
    /// When the measurement was taken (UTC).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub measured_at: OffsetDateTime,
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
    /// PM10 concentration in µg/m³.
    pub pm10: f64,
    /// Relative humidity percentage (compensated).
    pub humidity: f64,
    /// Relative humidity percentage (raw sensor value).
    pub humidity_raw: f64,
    /// Temperature in °C (compensated).
    pub temperature: f64,
    /// Temperature in °C (raw sensor value).
    pub temperature_raw: f64,
    /// UV index.
    pub uv: f64,
    /// Illuminance in lux.
    pub light_quantity: f64,
    /// Atmospheric pressure in hPa.
    pub atmospheric_pressure: f64,
}

impl Reading {
    /// Ordering key used across page boundaries.
    ///
    /// `measured_at` orders the series; `id` breaks ties when several
    /// readings share one timestamp.
    pub fn sort_key(&self) -> (OffsetDateTime, &str) {
        (self.measured_at, self.id.as_str())
    }
}

impl TryFrom<&RawReading> for Reading {
    type Error = ParseError;

    fn try_from(raw: &RawReading) -> Result<Self, Self::Error> {
        let measured_at = timecodec::parse_wire(&raw.measure_time)?;
        Ok(Self {
            id: raw.id.clone(),
            measured_at,
            pm25: raw.pm25,
            pm10: raw.pm10,
            humidity: raw.humidity,
            humidity_raw: raw.humidity_raw,
            temperature: raw.temperature,
            temperature_raw: raw.temperature_raw,
            uv: raw.uv,
            light_quantity: raw.light_quantity,
            atmospheric_pressure: raw.atmospheric_pressure,
        })
    }
}

/// Convert a batch of raw rows, skipping records whose timestamp cannot be
/// parsed.
///
/// Charting consumers must not fail the whole batch on one malformed record:
/// the bad record is dropped and its error recorded for the caller to log.
pub fn readings_from_rows(rows: &[RawReading]) -> (Vec<Reading>, Vec<ParseError>) {
    let mut readings = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    for row in rows {
        match Reading::try_from(row) {
            Ok(reading) => readings.push(reading),
            Err(e) => errors.push(e),
        }
    }
    (readings, errors)
}

/// Error produced when a window's bounds are inverted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("window end {end} precedes start {start}")]
pub struct InvalidWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// The inclusive time range requested for a historical fetch.
///
/// An immutable value passed into every fetch; the engine holds no window
/// state of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    /// Inclusive lower bound (UTC).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub start: OffsetDateTime,
    /// Inclusive upper bound (UTC).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub end: OffsetDateTime,
}

impl Window {
    /// Create a window from explicit bounds.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, InvalidWindow> {
        if end < start {
            return Err(InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a window from a date-only selection.
    ///
    /// The start is midnight UTC of the first day; the end is normalized to
    /// 23:59:59 UTC of the selected last calendar day.
    pub fn from_dates(start: Date, end: Date) -> Result<Self, InvalidWindow> {
        Self::new(
            start.with_time(Time::MIDNIGHT).assume_utc(),
            end.with_hms(23, 59, 59)
                .unwrap_or_else(|_| end.with_time(Time::MIDNIGHT))
                .assume_utc(),
        )
    }

    /// Whether an instant falls within the window (inclusive on both ends).
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            timecodec::format_wire(self.start),
            timecodec::format_wire(self.end)
        )
    }
}

/// Identifier for one numeric metric carried by a [`Reading`].
///
/// Each variant maps to a pure extraction function so consumers iterate the
/// mapping once instead of duplicating per-metric extraction logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum Metric {
    Pm25,
    Pm10,
    Humidity,
    HumidityRaw,
    Temperature,
    TemperatureRaw,
    Uv,
    LightQuantity,
    AtmosphericPressure,
}

impl Metric {
    /// All metrics, in display order.
    pub const ALL: [Metric; 9] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pm25,
        Metric::Pm10,
        Metric::Uv,
        Metric::LightQuantity,
        Metric::AtmosphericPressure,
        Metric::TemperatureRaw,
        Metric::HumidityRaw,
    ];

    /// Extract this metric's value from a reading.
    pub fn extract(&self, reading: &Reading) -> f64 {
        match self {
            Metric::Pm25 => reading.pm25,
            Metric::Pm10 => reading.pm10,
            Metric::Humidity => reading.humidity,
            Metric::HumidityRaw => reading.humidity_raw,
            Metric::Temperature => reading.temperature,
            Metric::TemperatureRaw => reading.temperature_raw,
            Metric::Uv => reading.uv,
            Metric::LightQuantity => reading.light_quantity,
            Metric::AtmosphericPressure => reading.atmospheric_pressure,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Pm25 => "PM2.5",
            Metric::Pm10 => "PM10",
            Metric::Humidity => "Humidity",
            Metric::HumidityRaw => "Humidity (raw)",
            Metric::Temperature => "Temperature",
            Metric::TemperatureRaw => "Temperature (raw)",
            Metric::Uv => "UV Index",
            Metric::LightQuantity => "Light",
            Metric::AtmosphericPressure => "Pressure",
        }
    }

    /// Measurement unit, empty when dimensionless.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Pm25 | Metric::Pm10 => "µg/m³",
            Metric::Humidity | Metric::HumidityRaw => "%",
            Metric::Temperature | Metric::TemperatureRaw => "°C",
            Metric::Uv => "",
            Metric::LightQuantity => "Lux",
            Metric::AtmosphericPressure => "hPa",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transient signal raised when a metric exceeds its static threshold.
///
/// Alerts are generated fresh each evaluation and never persisted or
/// deduplicated; `metric` is the stable identity a delivery sink keys on to
/// replace its own most recent instance without affecting other metrics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alert {
    /// Which metric breached its threshold.
    pub metric: Metric,
    /// Short headline.
    pub title: String,
    /// Detail line including the observed value.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn raw(time: &str, id: &str) -> RawReading {
        RawReading {
            measure_time: time.to_string(),
            id: id.to_string(),
            pm25: 12.0,
            ..RawReading::default()
        }
    }

    #[test]
    fn test_reading_from_raw() {
        let reading = Reading::try_from(&raw("2024-03-01T10:00:00.5+00:00", "42")).unwrap();
        assert_eq!(reading.measured_at, datetime!(2024-03-01 10:00:00 UTC));
        assert_eq!(reading.id, "42");
        assert_eq!(reading.pm25, 12.0);
        assert_eq!(reading.uv, 0.0);
    }

    #[test]
    fn test_reading_from_raw_bad_timestamp() {
        assert!(Reading::try_from(&raw("not-a-date", "1")).is_err());
    }

    #[test]
    fn test_batch_skips_malformed_records() {
        let rows = vec![
            raw("2024-03-01T10:00:00", "1"),
            raw("2024-03-01T10:05:00", "2"),
            raw("not-a-date", "3"),
            raw("2024-03-01T10:10:00", "4"),
            raw("2024-03-01T10:15:00", "5"),
        ];
        let (readings, errors) = readings_from_rows(&rows);
        assert_eq!(readings.len(), 4);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("not-a-date"));
    }

    #[test]
    fn test_window_from_dates_normalizes_end_of_day() {
        let w = Window::from_dates(date!(2024-03-01), date!(2024-03-02)).unwrap();
        assert_eq!(w.start, datetime!(2024-03-01 00:00:00 UTC));
        assert_eq!(w.end, datetime!(2024-03-02 23:59:59 UTC));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let result = Window::new(
            datetime!(2024-03-02 00:00:00 UTC),
            datetime!(2024-03-01 00:00:00 UTC),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = Window::from_dates(date!(2024-03-01), date!(2024-03-01)).unwrap();
        assert!(w.contains(datetime!(2024-03-01 00:00:00 UTC)));
        assert!(w.contains(datetime!(2024-03-01 23:59:59 UTC)));
        assert!(!w.contains(datetime!(2024-03-02 00:00:00 UTC)));
    }

    #[test]
    fn test_metric_extraction_covers_all_fields() {
        let mut reading = Reading::try_from(&raw("2024-03-01T10:00:00", "1")).unwrap();
        reading.temperature = 21.5;
        reading.atmospheric_pressure = 1013.0;

        assert_eq!(Metric::Pm25.extract(&reading), 12.0);
        assert_eq!(Metric::Temperature.extract(&reading), 21.5);
        assert_eq!(Metric::AtmosphericPressure.extract(&reading), 1013.0);

        // Every variant must extract without panicking.
        for metric in Metric::ALL {
            let _ = metric.extract(&reading);
            assert!(!metric.label().is_empty());
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_raw_reading_deserializes_sparse_row() {
        let json = r#"{"PM25": 36.5, "Measure_time": "2024-03-01T10:00:00"}"#;
        let row: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(row.pm25, 36.5);
        assert_eq!(row.pm10, 0.0);
        assert_eq!(row.id, "");
        assert_eq!(row.measure_time, "2024-03-01T10:00:00");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_raw_reading_deserializes_full_row() {
        let json = r#"{
            "PM25": 10.1, "PM10": 20.2, "ID": "abc",
            "Humidity": 45.0, "Humidity_raw": 47.5,
            "Temperature": 21.5, "Temperature_raw": 22.0,
            "UV": 1.2, "Light_quantity": 350.0,
            "Atmospheric_pressure": 1013.2,
            "Measure_time": "2024-03-01T10:00:00"
        }"#;
        let row: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(row.pm10, 20.2);
        assert_eq!(row.id, "abc");
        assert_eq!(row.light_quantity, 350.0);
    }
}
