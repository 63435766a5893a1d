//! Uptime measurement and formatting

use chrono::{DateTime, Duration, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
/// A "year" for uptime display is 52 weeks
const YEAR: i64 = 364 * DAY;

/// Elapsed running time in whole seconds
///
/// A launch time in the future (clock skew between the provider and us)
/// yields zero rather than a negative duration.
pub fn uptime(now: DateTime<Utc>, launch_time: DateTime<Utc>) -> Duration {
    let secs = now.signed_duration_since(launch_time).num_seconds();
    Duration::seconds(secs.max(0))
}

/// Render an uptime as `1y 2w 3d 4h 5m 6s`
///
/// Units with a zero value are omitted, except seconds which always close
/// the string.
pub fn format_uptime(uptime: Duration) -> String {
    let mut remaining = uptime.num_seconds().max(0);
    let mut parts = Vec::with_capacity(6);

    for (unit, suffix) in [(YEAR, 'y'), (WEEK, 'w'), (DAY, 'd'), (HOUR, 'h'), (MINUTE, 'm')] {
        let value = remaining / unit;
        remaining %= unit;
        if value > 0 {
            parts.push(format!("{}{}", value, suffix));
        }
    }
    parts.push(format!("{}s", remaining));

    parts.join(" ")
}
