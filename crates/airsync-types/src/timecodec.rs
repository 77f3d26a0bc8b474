//! Wire and display timestamp codec.
//!
//! The remote store serves timestamps as `YYYY-MM-DDTHH:MM:SS` with an
//! optional fractional-second suffix and/or UTC marker (`.123456`, `+00:00`,
//! `Z`), always in UTC. Parsing truncates to the first 19 characters so any
//! suffix variant is accepted, then interprets the result as a UTC instant.
//!
//! # Example
//!
//! ```
//! use airsync_types::timecodec;
//! use time::UtcOffset;
//!
//! let t = timecodec::parse_wire("2024-03-01T12:30:45.123456+00:00").unwrap();
//! assert_eq!(timecodec::format_wire(t), "2024-03-01T12:30:45");
//! assert_eq!(timecodec::format_display(t, UtcOffset::UTC), "2024.03.01 12:30");
//! ```

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{ParseError, ParseResult};

/// Number of characters carrying second-precision date and time on the wire.
const WIRE_LEN: usize = 19;

const WIRE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const DISPLAY_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year].[month].[day] [hour]:[minute]");

/// Parse a wire timestamp into a UTC instant.
///
/// Accepts any fractional-second and/or UTC-marker suffix by truncating to
/// the first 19 characters before matching the fixed layout.
pub fn parse_wire(raw: &str) -> ParseResult<OffsetDateTime> {
    let head = raw.get(..WIRE_LEN).ok_or_else(|| {
        ParseError::invalid_timestamp(raw, format!("shorter than {WIRE_LEN} characters"))
    })?;

    PrimitiveDateTime::parse(head, WIRE_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| ParseError::invalid_timestamp(raw, e.to_string()))
}

/// Format an instant back to the wire layout (UTC, second precision).
pub fn format_wire(instant: OffsetDateTime) -> String {
    instant
        .to_offset(UtcOffset::UTC)
        .format(WIRE_FORMAT)
        .unwrap_or_default()
}

/// Format an instant for human display at the given offset (minute precision).
///
/// The `time` crate carries no timezone database, so the caller supplies the
/// offset to render in.
pub fn format_display(instant: OffsetDateTime, offset: UtcOffset) -> String {
    instant
        .to_offset(offset)
        .format(DISPLAY_FORMAT)
        .unwrap_or_default()
}

/// Display a wire timestamp, falling back to the raw string.
///
/// Single-value display consumers must not fail the whole operation on a
/// malformed timestamp; the unparsed string is shown instead.
pub fn display_or_raw(raw: &str, offset: UtcOffset) -> String {
    match parse_wire(raw) {
        Ok(instant) => format_display(instant, offset),
        Err(_) => raw.to_string(),
    }
}
