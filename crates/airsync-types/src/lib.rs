//! Platform-agnostic types for the airsync sensor sync engine.
//!
//! This crate provides the data model shared by the engine and its
//! collaborators:
//!
//! - [`Reading`] and the raw wire row [`RawReading`]
//! - [`Window`] for inclusive fetch ranges
//! - [`Metric`] with its static extraction mapping
//! - [`Alert`] for threshold breaches
//! - the wire/display timestamp codec in [`timecodec`]
//!
//! # Example
//!
//! ```
//! use airsync_types::{Metric, RawReading, Reading};
//!
//! let raw = RawReading {
//!     pm25: 36.5,
//!     measure_time: "2024-03-01T10:00:00".to_string(),
//!     ..RawReading::default()
//! };
//! let reading = Reading::try_from(&raw).unwrap();
//! assert_eq!(Metric::Pm25.extract(&reading), 36.5);
//! ```

pub mod error;
pub mod timecodec;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Alert, InvalidWindow, Metric, RawReading, Reading, Window, readings_from_rows,
};
