//! Date handling for credential and proof timestamps.
//!
//! Timestamps in credentials and proofs are interchanged as ISO-8601 strings
//! in UTC with second precision (`YYYY-MM-DDTHH:mm:ssZ`), matching the W3C
//! examples. Parsing accepts any RFC 3339 offset.

use chrono::prelude::*;
use chrono::SecondsFormat;

/// Tolerated clock skew (in seconds) between the party that created a
/// document and the party verifying it. An issuance or proof-creation date
/// this far in the future is still accepted.
pub const MAX_CLOCK_SKEW_SECS: i64 = 15;

/// The current time as an ISO-8601 UTC string without fractional seconds.
pub fn now_iso_seconds() -> String {
    to_iso_seconds(&Utc::now())
}

/// Render a timestamp as an ISO-8601 UTC string without fractional seconds.
pub fn to_iso_seconds(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 / RFC 3339 date string into a UTC timestamp.
pub fn parse_iso(date: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// True if `date` is in the future by more than the tolerated clock skew.
pub fn is_in_future(date: &DateTime<Utc>) -> bool {
    date.timestamp() > Utc::now().timestamp() + MAX_CLOCK_SKEW_SECS
}

/// True if `date` is in the past by more than the tolerated clock skew.
pub fn is_in_past(date: &DateTime<Utc>) -> bool {
    date.timestamp() < Utc::now().timestamp() - MAX_CLOCK_SKEW_SECS
}
