use serde::{Deserialize, Serialize};

use super::{cell, Student};
use crate::dates::normalize_cell;

// ============================================================================
// Booking rows: A = date, B = student name (denormalized), C = student id
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Normalized `YYYY-MM-DD`.
    pub date: String,
    pub student_id: String,
    pub student_name: String,
}

impl Booking {
    pub fn from_row(row: &[String]) -> Option<Self> {
        let date = normalize_cell(&cell(row, 0));
        if date.is_empty() {
            return None;
        }
        Some(Booking {
            date,
            student_name: cell(row, 1),
            student_id: cell(row, 2),
        })
    }

    pub fn for_student(date: &str, student: &Student) -> Self {
        Booking {
            date: date.to_string(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
        }
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.student_name.clone(),
            self.student_id.clone(),
        ]
    }

    pub fn matches(&self, date: &str, student_id: &str) -> bool {
        self.date == date && self.student_id == student_id
    }
}

/// Students booked on one date. Derived on every sync, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInfo {
    pub date: String,
    pub students: Vec<Student>,
    /// False for bookings whose class day no longer exists.
    pub is_class_day: bool,
}
