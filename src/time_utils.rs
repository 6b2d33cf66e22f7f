// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use crate::error::AppError;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with an explicit `+00:00` offset.
///
/// The bank rejects `valid_until` values without a timezone.
pub fn format_utc_offset(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Consent expiry `minutes` from `now`.
pub fn valid_until(now: DateTime<Utc>, minutes: i64) -> Result<String, AppError> {
    Duration::try_minutes(minutes)
        .and_then(|delta| now.checked_add_signed(delta))
        .map(format_utc_offset)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Consent validity of {} minutes is out of range",
                minutes
            ))
        })
}

/// Parse a user-supplied `YYYY-MM-DD` date.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid '{}' parameter: expected YYYY-MM-DD, got '{}'",
            field, raw
        ))
    })
}

/// Date `days` before `now`, used as the default transaction window start.
pub fn days_ago(now: DateTime<Utc>, days: i64) -> NaiveDate {
    (now - Duration::days(days)).date_naive()
}
