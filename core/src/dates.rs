//! Date parsing and calendar arithmetic.
//!
//! Dates arrive as strings in one of two shapes:
//!   - `YYYY-MM-DD` (storage form, unambiguous)
//!   - `D/M/YYYY` slash form typed by people, where day and month order
//!     is decided by magnitude. The year always has four digits.
//!
//! Slash rules, applied in order:
//!   1. first component > 12  → DD/MM/YYYY
//!   2. second component > 12 → MM/DD/YYYY
//!   3. both ≤ 12             → DD/MM/YYYY (ambiguous, day first)

use chrono::{Datelike, Months, NaiveDate};

use crate::types::DayCount;

/// Parse a date string. Returns `None` for anything that is not a real
/// calendar date in one of the accepted shapes.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('/') {
        parse_slash_date(s)
    } else {
        parse_iso_date(s)
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    // Timestamps such as "2025-03-15T10:00:00Z" carry their date up front.
    let date_part = s.split(['T', ' ']).next()?;
    let mut parts = date_part.split('-');
    let year = parse_year(parts.next()?)?;
    let month = parse_component(parts.next()?, 2)?;
    let day = parse_component(parts.next()?, 2)?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('/');
    let a = parse_component(parts.next()?, 2)?;
    let b = parse_component(parts.next()?, 2)?;
    let year = parse_year(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    let (day, month) = if a > 12 {
        (a, b)
    } else if b > 12 {
        (b, a)
    } else {
        (a, b)
    };
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

/// Digits only, 1..=max_len of them.
fn parse_component(raw: &str, max_len: usize) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > max_len || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Exactly four digits. "25" is not read as year 25.
fn parse_year(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.len() != 4 {
        return None;
    }
    parse_component(raw, 4)
}

/// Add `months` calendar months, keeping the day of month and clamping to
/// the last day of the target month when it is shorter.
///
/// Always computed from the original date, so `D + 1 + 1 == D + 2` for any
/// day that never needs clamping.
pub fn add_months_stable(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Last valid day of the given month.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Whole calendar days from `from` to `to`. Negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> DayCount {
    (to - from).num_days()
}

/// `DD/MM/YYYY`, the form shown to people.
pub fn format_for_display(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `YYYY-MM-DD`, the form written to storage.
pub fn format_for_storage(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Re-render any accepted input in storage form.
pub fn normalize_for_storage(input: &str) -> Option<String> {
    parse_date(input).map(format_for_storage)
}
