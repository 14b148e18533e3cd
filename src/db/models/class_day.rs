use serde::{Deserialize, Serialize};

use super::cell;
use crate::dates::normalize_cell;

/// An open class session (ClassDays sheet, column A).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassDay {
    /// Normalized `YYYY-MM-DD`.
    pub date: String,
}

impl ClassDay {
    pub fn from_row(row: &[String]) -> Option<Self> {
        let date = normalize_cell(&cell(row, 0));
        (!date.is_empty()).then_some(ClassDay { date })
    }
}
