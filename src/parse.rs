//! Validation of the raw values a web layer receives: `date=YYYY-MM-DD`,
//! `time=HH:MM`, `duration=45` (or the booking record's `45-min`), `year`/`month`.
//! Bad input is always an error; nothing here falls back to a default.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::engine::EngineError;
use crate::limits::*;

pub fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidDate(format!("{s:?}: {e}")))?;
    check_year(date.year())?;
    Ok(date)
}

pub fn parse_time(s: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| EngineError::InvalidDate(format!("time {s:?}: {e}")))
}

/// Accepts `"45"` and `"45-min"`.
pub fn parse_duration(s: &str) -> Result<u32, EngineError> {
    let trimmed = s.trim();
    let digits = trimmed.strip_suffix("-min").unwrap_or(trimmed);
    let minutes: i64 = digits
        .parse()
        .map_err(|_| EngineError::InvalidDuration(format!("{s:?} is not a number of minutes")))?;
    if minutes <= 0 {
        return Err(EngineError::InvalidDuration(format!("{minutes} must be positive")));
    }
    let minutes = u32::try_from(minutes)
        .map_err(|_| EngineError::InvalidDuration(format!("{minutes} is too long")))?;
    validate_duration(minutes)
}

pub fn validate_duration(minutes: u32) -> Result<u32, EngineError> {
    if minutes == 0 {
        return Err(EngineError::InvalidDuration("0 must be positive".into()));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(EngineError::InvalidDuration(format!(
            "{minutes} exceeds {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(minutes)
}

pub fn parse_year_month(year: &str, month: &str) -> Result<(i32, u32), EngineError> {
    let y: i32 = year
        .trim()
        .parse()
        .map_err(|_| EngineError::InvalidDate(format!("year {year:?}")))?;
    let m: u32 = month
        .trim()
        .parse()
        .map_err(|_| EngineError::InvalidDate(format!("month {month:?}")))?;
    month_bounds(y, m)?;
    Ok((y, m))
}

/// First and last calendar day of a month, both inclusive.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), EngineError> {
    check_year(year)?;
    if !(1..=12).contains(&month) {
        return Err(EngineError::InvalidDate(format!("month {month} not in 1..=12")));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::InvalidDate(format!("{year}-{month:02}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next
        .and_then(|n| n.pred_opt())
        .ok_or_else(|| EngineError::InvalidDate(format!("{year}-{month:02}")))?;
    Ok((first, last))
}

fn check_year(year: i32) -> Result<(), EngineError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(EngineError::InvalidDate(format!(
            "year {year} not in {MIN_YEAR}..={MAX_YEAR}"
        )));
    }
    Ok(())
}
