//! Canonical `YYYY-MM-DD` keys used to join class days and bookings.

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

/// Normalize a `-` or `/` separated year-month-day string into a zero-padded
/// `YYYY-MM-DD` key. `2024/3/5`, `2024-3-5` and `2024-03-05` all yield `2024-03-05`.
pub fn normalize_date(input: &str) -> AppResult<String> {
    parse_date(input)
        .map(format_date)
        .ok_or_else(|| AppError::BadRequest(crate::i18n::t_with("date.invalid", &[("date", input)])))
}

/// Canonical key for an already parsed date.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Normalize a cell read back from the sheet. Cells that are not dates are kept
/// verbatim (trimmed) so that they simply never match a real key.
pub fn normalize_cell(cell: &str) -> String {
    match parse_date(cell) {
        Some(date) => format_date(date),
        None => {
            let raw = cell.trim();
            if !raw.is_empty() {
                tracing::debug!("Cell '{}' is not a date; keeping it verbatim", raw);
            }
            raw.to_string()
        }
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    let mut parts = input.trim().split(['-', '/']);
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
