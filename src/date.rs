use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

/// Parse a feed publish date. Feeds and converters disagree on format, so
/// RFC 2822, RFC 3339 and the converter's `YYYY-MM-DD HH:MM:SS` (UTC) are
/// all accepted.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Display label for a publish date: ISO week number with the calendar year,
/// e.g. `Week 1/52 | 2024`. Returns `None` when the date does not parse.
pub fn week_label(raw: &str) -> Option<String> {
    let date = parse_pub_date(raw)?;
    Some(format!("Week {}/52 | {}", date.iso_week().week(), date.year()))
}
