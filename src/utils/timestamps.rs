use chrono::{DateTime, Datelike, Duration, Utc};

/// Relative ages are shown up to this span, dates beyond it
const RELATIVE_SPAN_DAYS: i64 = 7;

/// Human form of `timestamp` as seen at `now`
///
/// Within a week: "just now", "45m ago", "3h ago", "5d ago". Older: "Jan 15",
/// with the year added when it differs from `now`'s. Future timestamps (clock
/// skew between machines) read as "just now".
pub fn format_timestamp(timestamp: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let age = now.signed_duration_since(*timestamp);
    if age >= Duration::days(RELATIVE_SPAN_DAYS) {
        let pattern = if timestamp.year() == now.year() { "%b %-d" } else { "%b %-d, %Y" };
        return timestamp.format(pattern).to_string();
    }

    match format_age(age.num_seconds()) {
        Some(age) => format!("{} ago", age),
        None => "just now".to_string(),
    }
}

/// Largest whole unit of an age in seconds ("3d", "2h", "45m"); `None` under a minute
pub fn format_age(seconds: i64) -> Option<String> {
    let age = Duration::seconds(seconds);
    [(age.num_days(), 'd'), (age.num_hours(), 'h'), (age.num_minutes(), 'm')]
        .into_iter()
        .find(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
}
