use std::time::{SystemTime, UNIX_EPOCH};

pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Wall-clock time in milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn minutes_from_now(minutes: i64) -> i64 {
    now_millis() + minutes * MILLIS_PER_MINUTE
}
