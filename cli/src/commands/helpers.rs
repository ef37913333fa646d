use anyhow::{Context, Result};
use chrono::{Datelike, Days, Duration, Local, NaiveDate};
use serde::Serialize;
use std::process;

use fivethirty_core::models::week_end;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Monday of the week containing `date`, if the calendar reaches back that far.
pub(crate) fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Resolve a `--week` argument: any date (or keyword) within the week,
/// defaulting to the current one.
pub(crate) fn parse_week(week: Option<String>) -> Result<NaiveDate> {
    let date = parse_date(week)?;
    let monday =
        monday_of(date).with_context(|| format!("Date {date} has no Monday before it"))?;
    week_end(monday)?;
    Ok(monday)
}

/// Resolve a `--from` argument: the window starts on exactly this date.
pub(crate) fn parse_window_start(from: Option<String>) -> Result<NaiveDate> {
    let start = parse_date(from)?;
    week_end(start)?;
    Ok(start)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max.saturating_sub(3)).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}
