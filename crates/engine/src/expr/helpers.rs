//! Fixed helper functions exposed to expressions.

use chrono::{DateTime, Datelike, Local, TimeZone};

use super::EvalError;

/// `date(ms, delim)` — local calendar date, components zero-padded.
pub(super) fn format_date(millis: i64, delimiter: &str) -> Result<String, EvalError> {
    let date = local_time(millis)?;
    Ok(format!(
        "{:04}{}{:02}{}{:02}",
        date.year(),
        delimiter,
        date.month(),
        delimiter,
        date.day()
    ))
}

/// `dateTime(ms)` — local date and time, components zero-padded.
pub(super) fn format_date_time(millis: i64) -> Result<String, EvalError> {
    let date = local_time(millis)?;
    Ok(date.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn local_time(millis: i64) -> Result<DateTime<Local>, EvalError> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| EvalError::Type(format!("invalid timestamp {millis}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn date_components_are_padded() {
        // 2021-02-03 in local time somewhere within the day; build the
        // expected string from chrono itself to stay timezone-neutral.
        let millis = 1_612_345_678_000;
        let local = Local.timestamp_millis_opt(millis).single().unwrap();
        let expected = format!(
            "{:04}-{:02}-{:02}",
            local.year(),
            local.month(),
            local.day()
        );
        assert_eq!(format_date(millis, "-").unwrap(), expected);
    }

    #[test]
    fn date_custom_delimiter() {
        let millis = 1_612_345_678_000;
        let formatted = format_date(millis, "/").unwrap();
        assert_eq!(formatted.matches('/').count(), 2);
    }

    #[test]
    fn date_time_has_both_parts() {
        let millis = 1_612_345_678_000;
        let local = Local.timestamp_millis_opt(millis).single().unwrap();
        let formatted = format_date_time(millis).unwrap();
        assert!(formatted.contains(&format!("{:02}:{:02}", local.hour(), local.minute())));
        assert_eq!(formatted.len(), "YYYY-MM-DD HH:MM:SS".len());
    }
}
