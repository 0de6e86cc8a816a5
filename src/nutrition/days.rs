use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, Duration, OffsetDateTime};

use super::{NutritionError, Result};

/// Half-open UTC interval covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: OffsetDateTime,
    pub end_exclusive: OffsetDateTime,
}

/// Parses a strict `YYYY-MM-DD` key into a calendar date.
pub fn parse_date_key(value: &str) -> Result<Date> {
    lazy_static! {
        static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    }
    if !DATE_RE.is_match(value) {
        return Err(NutritionError::InvalidDate(value.to_string()));
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| NutritionError::InvalidDate(value.to_string()))
}

pub fn date_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Day bucket for a `YYYY-MM-DD` key, starting at UTC midnight.
pub fn day_range(value: &str) -> Result<DayRange> {
    let date = parse_date_key(value)?;
    day_range_of(date)
}

/// Day bucket for an already parsed calendar date. Fails on the last
/// representable date, whose end cannot be expressed.
pub fn day_range_of(date: Date) -> Result<DayRange> {
    let next = date
        .next_day()
        .ok_or_else(|| NutritionError::InvalidDate(date_key(date)))?;
    Ok(DayRange {
        start: date.midnight().assume_utc(),
        end_exclusive: next.midnight().assume_utc(),
    })
}

/// Sunday-start week containing `date`, as an inclusive `(first, last)` pair.
pub fn week_range(date: Date) -> Result<(Date, Date)> {
    let out_of_range = || NutritionError::InvalidDate(date_key(date));
    let back = i64::from(date.weekday().number_days_from_sunday());
    let first = date
        .checked_sub(Duration::days(back))
        .ok_or_else(out_of_range)?;
    let last = first
        .checked_add(Duration::days(6))
        .ok_or_else(out_of_range)?;
    Ok((first, last))
}
