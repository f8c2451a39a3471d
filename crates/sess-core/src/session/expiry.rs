//! Expiry computation for session records
//!
//! A record's expiry is always derived at write time: `now + cookie.maxAge`
//! when the session carries a max-age, `now + default` otherwise.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

/// Max-age used when a session has no `cookie.maxAge` (one day)
pub const DEFAULT_MAX_AGE_SECS: i64 = 86_400;

/// Read `cookie.maxAge` (seconds) from a session document.
///
/// Only a non-zero JSON number counts. A negative value is returned as-is
/// and yields a record that is already expired.
pub fn max_age_secs(session: &JsonValue) -> Option<f64> {
    let max_age = session.get("cookie")?.get("maxAge")?.as_f64()?;
    (max_age != 0.0 && max_age.is_finite()).then_some(max_age)
}

/// Compute the absolute expiry of `session` relative to `now`.
///
/// Fails with [`crate::Error::InvalidExpiry`] when the resulting timestamp
/// cannot be stored as a four-digit-year ISO-8601 string.
pub fn compute_expiry(
    session: &JsonValue,
    default_max_age_secs: i64,
    now: DateTime<Utc>,
) -> crate::Result<DateTime<Utc>> {
    let age = match max_age_secs(session) {
        Some(secs) => Duration::try_milliseconds((secs * 1000.0).round() as i64),
        None => Duration::try_seconds(default_max_age_secs),
    };

    age.and_then(|age| now.checked_add_signed(age))
        .filter(|expire| (0..=9999).contains(&expire.year()))
        .ok_or_else(|| {
            crate::Error::InvalidExpiry(format!(
                "max-age {:?} is out of range",
                max_age_secs(session).unwrap_or(default_max_age_secs as f64)
            ))
        })
}

/// Format an expiry the way it is stored: ISO-8601 UTC with millisecond precision.
pub fn format_expiry(expire: DateTime<Utc>) -> String {
    expire.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored expiry string.
pub fn parse_expiry(value: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::InvalidExpiry(format!("{}: {}", value, e)))
}
