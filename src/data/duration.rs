use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

/// Suffix to nanoseconds multiplier (order matters: "ms" must be tried before "m" and "s")
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
    ("s", 1_000_000_000.0),
];

/// Parse duration strings like "60s", "500ms", "1.5s", "2m"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Format a response time given in microseconds as milliseconds with two decimals.
pub fn format_response_time(micros: f64) -> String {
    format!("{:.2}ms", micros / 1_000.0)
}

/// Default relative-time formatter: whole seconds elapsed since `anchor`.
///
/// Anchors in the future (clock skew between producer and viewer) read as "0s ago".
pub fn humanize_elapsed(anchor: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - anchor).num_seconds().max(0);
    format!("{}s ago", secs)
}
