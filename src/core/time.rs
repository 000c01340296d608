//! Shared timestamp helpers.
//!
//! All timestamps in the store are unix-epoch seconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix-epoch seconds as stored in the `file` table.
pub type Timestamp = i64;

/// Returns the current time in unix-epoch seconds.
pub fn now_epoch_secs() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or_default()
}

/// Converts a filesystem time into unix-epoch seconds. Times before the epoch are negative.
pub fn epoch_secs(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as Timestamp,
        Err(e) => -(e.duration().as_secs() as Timestamp),
    }
}

/// Renders epoch seconds with a `Z` suffix (e.g. `1771220592Z`).
pub fn format_epoch_z(ts: Timestamp) -> String {
    format!("{}Z", ts)
}
