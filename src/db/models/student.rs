use serde::{Deserialize, Serialize};

use super::cell;

// ============================================================================
// Roster rows: A = id, B = name, C = instagram, D = active ("true"/"false")
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Numeric string assigned on creation, never reused.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub instagram: String,
    /// Deactivated students stay in the roster with their bookings.
    pub active: bool,
}

impl Student {
    /// Parse a roster row. Rows without an id are not students.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let id = cell(row, 0);
        if id.is_empty() {
            return None;
        }
        Some(Student {
            id,
            name: cell(row, 1),
            instagram: cell(row, 2),
            active: cell(row, 3).eq_ignore_ascii_case("true"),
        })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.instagram.clone(),
            self.active.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    #[serde(default)]
    pub instagram: String,
}

/// Partial edit of a student; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub instagram: Option<String>,
    pub active: Option<bool>,
}

impl StudentUpdate {
    pub fn apply_to(&self, student: &Student) -> Student {
        Student {
            id: student.id.clone(),
            name: self
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| student.name.clone()),
            instagram: self
                .instagram
                .as_ref()
                .map(|i| i.trim().to_string())
                .unwrap_or_else(|| student.instagram.clone()),
            active: self.active.unwrap_or(student.active),
        }
    }
}
