//! Window Resolver
//!
//! Turns a relative day count, the unbounded sentinel, or an explicit
//! `(from, to)` pair into a validated [`TimeWindow`]. Pure: the caller passes
//! `now`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AggregationError, AggregationResult};
use crate::models::window::{TimeWindow, WindowRequest};

/// `range` value selecting the custom window
pub const CUSTOM_RANGE: &str = "0";
/// `range` value selecting the unbounded window
pub const UNBOUNDED_RANGE: &str = "all";

/// Interpret the `range`/`from`/`to` inputs shared by the HTTP API and the CLI
pub fn parse_range(
    range: Option<&str>,
    from: Option<String>,
    to: Option<String>,
) -> AggregationResult<WindowRequest> {
    let Some(range) = range.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(WindowRequest::default());
    };

    if range == CUSTOM_RANGE {
        return Ok(WindowRequest::Custom { from, to });
    }

    if range.eq_ignore_ascii_case(UNBOUNDED_RANGE) {
        return Ok(WindowRequest::Relative { days: None });
    }

    range
        .parse::<u32>()
        .map(|days| WindowRequest::Relative { days: Some(days) })
        .map_err(|_| AggregationError::InvalidRange(format!("invalid range '{}'", range)))
}

/// Resolve a window request against `now`
pub fn resolve_window(request: &WindowRequest, now: DateTime<Utc>) -> AggregationResult<TimeWindow> {
    let window = match request {
        WindowRequest::Relative { days: Some(days) } => {
            let from = now
                .checked_sub_signed(Duration::days(i64::from(*days)))
                .ok_or_else(|| AggregationError::InvalidRange(format!("{} days is out of range", days)))?;
            TimeWindow { from, to: now }
        }
        WindowRequest::Relative { days: None } => TimeWindow {
            from: DateTime::from_timestamp(0, 0).unwrap_or(DateTime::<Utc>::MIN_UTC),
            to: now,
        },
        WindowRequest::Custom { from, to } => TimeWindow {
            from: parse_bound("from", from.as_deref())?,
            to: parse_bound("to", to.as_deref())?,
        },
    };

    if window.from > window.to {
        return Err(AggregationError::InvalidRange(format!(
            "from ({}) is after to ({})",
            window.from, window.to
        )));
    }

    Ok(window)
}

fn parse_bound(name: &str, raw: Option<&str>) -> AggregationResult<DateTime<Utc>> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AggregationError::InvalidRange(format!("custom window requires '{}'", name)))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    // datetime-local form value, no offset
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AggregationError::InvalidRange(format!("cannot parse '{}' value '{}'", name, raw)))
}
