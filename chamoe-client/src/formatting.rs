use chrono::{DateTime, Utc};

/// Format a timestamp as date and time
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}

/// Relative age of `timestamp` as of `now`.
///
/// Anything a week or older falls back to the calendar date.
pub fn format_relative_to(timestamp: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let seconds = (*now - *timestamp).num_seconds().max(0);

    match seconds {
        0..=59 => "just now".to_string(),
        60..=3_599 => plural(seconds / 60, "minute"),
        3_600..=86_399 => plural(seconds / 3_600, "hour"),
        86_400..=604_799 => plural(seconds / 86_400, "day"),
        _ => timestamp.format("%Y-%m-%d").to_string(),
    }
}

pub fn format_relative(timestamp: &DateTime<Utc>) -> String {
    format_relative_to(timestamp, &Utc::now())
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Wrap post or comment text for terminal output, indenting every line
pub fn wrap_content(content: &str, width: usize, indent: &str) -> String {
    let options = textwrap::Options::new(width.max(indent.len() + 10))
        .initial_indent(indent)
        .subsequent_indent(indent);
    textwrap::fill(content, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_buckets() {
        let now = now();
        assert_eq!(format_relative_to(&(now - Duration::seconds(30)), &now), "just now");
        assert_eq!(format_relative_to(&(now - Duration::minutes(1)), &now), "1 minute ago");
        assert_eq!(format_relative_to(&(now - Duration::minutes(45)), &now), "45 minutes ago");
        assert_eq!(format_relative_to(&(now - Duration::hours(3)), &now), "3 hours ago");
        assert_eq!(format_relative_to(&(now - Duration::days(6)), &now), "6 days ago");
        assert_eq!(format_relative_to(&(now - Duration::days(7)), &now), "2024-06-08");
    }

    #[test]
    fn test_future_timestamps_are_just_now() {
        let now = now();
        assert_eq!(format_relative_to(&(now + Duration::minutes(5)), &now), "just now");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&now()), "2024-06-15 12:00");
    }

    #[test]
    fn test_wrap_content_indents_lines() {
        let wrapped = wrap_content("one two three four five six", 14, "  ");
        for line in wrapped.lines() {
            assert!(line.starts_with("  "));
            assert!(line.len() <= 14);
        }
        assert!(wrapped.lines().count() > 1);
    }
}
