//! Row models for the three tables plus the joined per-day view.

pub mod booking;
pub mod class_day;
pub mod student;

pub use self::booking::*;
pub use self::class_day::*;
pub use self::student::*;

/// Trimmed cell `index` of a row; cells past the end read as empty.
pub(crate) fn cell(row: &[String], index: usize) -> String {
    row.get(index).map(|c| c.trim().to_string()).unwrap_or_default()
}
