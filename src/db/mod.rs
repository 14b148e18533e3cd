//! The spreadsheet used as the system of record: typed rows, row addressing,
//! authenticated table access and per-table repositories.

pub mod locator;
pub mod models;
pub mod repository;
pub mod store;

pub use repository::{BookingRepository, ClassDayRepository, StudentRepository};
pub use store::{SheetHandle, SheetStore};
