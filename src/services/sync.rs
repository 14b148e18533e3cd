use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::db::models::{Booking, BookingInfo, ClassDay, Student};
use crate::db::{BookingRepository, ClassDayRepository, SheetHandle, StudentRepository};
use crate::error::AppResult;

/// Everything read in one sync cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSnapshot {
    pub class_days: Vec<ClassDay>,
    pub bookings: Vec<Booking>,
    pub students: Vec<Student>,
}

/// Reads the three tables and joins bookings to students per class day.
pub struct SyncAggregator;

impl SyncAggregator {
    /// Read all three tables concurrently. Any failing read fails the whole sync.
    pub async fn sync_all(sheet: &SheetHandle) -> AppResult<SyncSnapshot> {
        tracing::debug!("Reading all tables of spreadsheet {}", sheet.spreadsheet_id());

        let (class_days, bookings, students) = tokio::try_join!(
            ClassDayRepository::list(sheet),
            BookingRepository::list(sheet),
            StudentRepository::list(sheet),
        )
        .map_err(|e| {
            tracing::error!("Error syncing all data: {}", e);
            e
        })?;

        tracing::debug!(
            "Read {} class day(s), {} booking(s), {} student(s)",
            class_days.len(),
            bookings.len(),
            students.len()
        );

        Ok(SyncSnapshot {
            class_days,
            bookings,
            students,
        })
    }

    /// Group bookings by date, resolving students by id.
    ///
    /// Every class day gets an entry, booked or not. Bookings on dates without a
    /// class day are kept as `is_class_day: false` entries so they stay visible.
    /// Bookings of ids missing from the roster are dropped.
    pub fn booking_infos(snapshot: &SyncSnapshot) -> Vec<BookingInfo> {
        let students: HashMap<&str, &Student> = snapshot
            .students
            .iter()
            .map(|s| (s.id.as_str(), s))
            .collect();

        let mut days: BTreeMap<&str, BookingInfo> = snapshot
            .class_days
            .iter()
            .map(|d| {
                (
                    d.date.as_str(),
                    BookingInfo {
                        date: d.date.clone(),
                        students: Vec::new(),
                        is_class_day: true,
                    },
                )
            })
            .collect();

        let mut unresolved = 0usize;
        for booking in &snapshot.bookings {
            let Some(student) = students.get(booking.student_id.as_str()) else {
                unresolved += 1;
                continue;
            };

            let info = days
                .entry(booking.date.as_str())
                .or_insert_with(|| BookingInfo {
                    date: booking.date.clone(),
                    students: Vec::new(),
                    is_class_day: false,
                });
            if !info.students.iter().any(|s| s.id == student.id) {
                info.students.push((*student).clone());
            }
        }

        if unresolved > 0 {
            tracing::warn!(
                "{} booking(s) reference students missing from the roster",
                unresolved
            );
        }

        days.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::TableNames;
    use crate::db::SheetStore;
    use crate::error::AppError;
    use crate::services::sheets::testing::{FakeSheets, VALID_TOKEN};

    fn student(id: &str, name: &str, active: bool) -> Student {
        Student {
            id: id.into(),
            name: name.into(),
            instagram: String::new(),
            active,
        }
    }

    fn booking(date: &str, id: &str, name: &str) -> Booking {
        Booking {
            date: date.into(),
            student_id: id.into(),
            student_name: name.into(),
        }
    }

    #[test]
    fn join_groups_bookings_under_class_days() {
        let snapshot = SyncSnapshot {
            class_days: vec![
                ClassDay { date: "2024-05-02".into() },
                ClassDay { date: "2024-05-01".into() },
            ],
            bookings: vec![
                booking("2024-05-01", "1", "Amy"),
                booking("2024-05-01", "2", "Ben"),
                booking("2024-05-01", "9", "Gone"),
            ],
            students: vec![student("1", "Amy", true), student("2", "Ben", false)],
        };

        let infos = SyncAggregator::booking_infos(&snapshot);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].date, "2024-05-01");
        assert_eq!(
            infos[0].students.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Amy", "Ben"]
        );
        assert!(infos[1].students.is_empty());
        assert!(infos.iter().all(|i| i.is_class_day));
    }

    #[test]
    fn bookings_without_class_day_are_flagged() {
        let snapshot = SyncSnapshot {
            class_days: vec![],
            bookings: vec![booking("2024-06-01", "1", "Amy")],
            students: vec![student("1", "Amy", true)],
        };

        let infos = SyncAggregator::booking_infos(&snapshot);
        assert_eq!(infos.len(), 1);
        assert!(!infos[0].is_class_day);
    }

    #[tokio::test]
    async fn sync_reads_all_tables() {
        let fake = Arc::new(FakeSheets::new());
        let tables = TableNames::default();
        fake.seed(&tables.class_days, &[&["2024-5-1"]]);
        fake.seed(&tables.bookings, &[&["2024-05-01", "Amy", "1"]]);
        fake.seed(&tables.roster, &[&["1", "Amy", "@amy", "true"]]);

        let store = SheetStore::new(fake, tables);
        store.set_access_token(Some(VALID_TOKEN.into())).await;
        let sheet = store.handle("spreadsheet").await.unwrap();

        let snapshot = SyncAggregator::sync_all(&sheet).await.unwrap();
        assert_eq!(snapshot.class_days[0].date, "2024-05-01");
        assert_eq!(snapshot.bookings.len(), 1);
        assert_eq!(snapshot.students[0].instagram, "@amy");
    }

    #[tokio::test]
    async fn one_failing_table_fails_the_sync() {
        let fake = Arc::new(FakeSheets::new());
        let tables = TableNames {
            bookings: "Renamed".into(),
            ..TableNames::default()
        };
        let store = SheetStore::new(fake, tables);
        store.set_access_token(Some(VALID_TOKEN.into())).await;
        let sheet = store.handle("spreadsheet").await.unwrap();

        assert!(matches!(
            SyncAggregator::sync_all(&sheet).await,
            Err(AppError::Remote(_))
        ));
    }
}
