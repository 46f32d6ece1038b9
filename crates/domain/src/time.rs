//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for `last_changed`, event times, auto-run bounds.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Offset a timestamp by a std duration, saturating at the far future.
#[must_use]
pub fn after(ts: Timestamp, duration: std::time::Duration) -> Timestamp {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
