use crate::dates::normalize_date;
use crate::db::locator::RowLocator;
use crate::db::models::{Booking, Student};
use crate::db::repository::StudentRepository;
use crate::db::store::{SheetHandle, Table};
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Column B of the Bookings sheet.
const NAME_COLUMN: usize = 1;

/// Repository for bookings (Bookings sheet).
pub struct BookingRepository;

impl BookingRepository {
    pub async fn list(sheet: &SheetHandle) -> AppResult<Vec<Booking>> {
        let rows = sheet.fetch_rows(Table::Bookings).await?;
        Ok(rows.iter().filter_map(|r| Booking::from_row(r)).collect())
    }

    /// Book every student in `student_ids` on `date`, one row each.
    ///
    /// All ids are resolved against the roster first; if any is unknown nothing is written.
    pub async fn add(
        sheet: &SheetHandle,
        date: &str,
        student_ids: &[String],
    ) -> AppResult<Vec<Booking>> {
        if student_ids.is_empty() {
            return Err(AppError::BadRequest(i18n::t("booking.no_students")));
        }
        let date = normalize_date(date)?;

        let roster = StudentRepository::list(sheet).await?;
        let mut selected: Vec<&Student> = Vec::with_capacity(student_ids.len());
        let mut missing: Vec<&str> = Vec::new();
        for id in student_ids {
            match roster.iter().find(|s| &s.id == id) {
                Some(student) => selected.push(student),
                None => missing.push(id),
            }
        }
        if !missing.is_empty() {
            tracing::warn!("Cannot book unknown students {:?} on {}", missing, date);
            return Err(AppError::NotFound(i18n::t_with(
                "students.not_found",
                &[("ids", missing.join(", ").as_str())],
            )));
        }

        let bookings: Vec<Booking> = selected
            .into_iter()
            .map(|s| Booking::for_student(&date, s))
            .collect();

        tracing::info!("Adding {} booking(s) on {}", bookings.len(), date);
        sheet
            .append_rows(Table::Bookings, bookings.iter().map(Booking::to_row).collect())
            .await?;
        sheet.sort_by_column(Table::Bookings, 0).await;

        Ok(bookings)
    }

    /// Delete every row booking `student_id` on `date`. Returns the number of
    /// rows removed; no match is not an error.
    pub async fn remove(sheet: &SheetHandle, student_id: &str, date: &str) -> AppResult<usize> {
        let date = normalize_date(date)?;

        let rows = sheet.fetch_rows(Table::Bookings).await?;
        let matches = RowLocator::find_all(&rows, |r| {
            Booking::from_row(r).is_some_and(|b| b.matches(&date, student_id))
        });

        if matches.is_empty() {
            tracing::info!("No booking of student {} on {} to remove", student_id, date);
            return Ok(0);
        }

        tracing::info!(
            "Removing booking of student {} on {} (sheet rows {:?})",
            student_id,
            date,
            matches.iter().map(|r| r.a1_row()).collect::<Vec<_>>()
        );
        sheet.delete_rows(Table::Bookings, matches).await
    }

    /// Rewrite the denormalized name on every booking row of `student`.
    pub async fn rename_student(sheet: &SheetHandle, student: &Student) -> AppResult<usize> {
        let rows = sheet.fetch_rows(Table::Bookings).await?;
        let targets =
            RowLocator::find_all(&rows, |r| r.get(2).is_some_and(|id| id.trim() == student.id));

        for row in &targets {
            sheet
                .update_cell(Table::Bookings, NAME_COLUMN, *row, student.name.clone())
                .await?;
        }

        if !targets.is_empty() {
            tracing::info!(
                "Renamed student {} on {} booking row(s)",
                student.id,
                targets.len()
            );
        }
        Ok(targets.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::TableNames;
    use crate::db::store::SheetStore;
    use crate::services::sheets::testing::{FakeSheets, VALID_TOKEN};
    use crate::services::sheets::BatchRequest;

    async fn setup(bookings: &[&[&str]]) -> (Arc<FakeSheets>, SheetHandle) {
        let fake = Arc::new(FakeSheets::new());
        let tables = TableNames::default();
        fake.seed(
            &tables.roster,
            &[
                &["1", "Amy", "", "true"],
                &["2", "Ben", "", "true"],
                &["3", "Cy", "", "false"],
            ],
        );
        fake.seed(&tables.bookings, bookings);
        let store = SheetStore::new(fake.clone(), tables);
        store.set_access_token(Some(VALID_TOKEN.into())).await;
        let handle = store.handle("spreadsheet").await.unwrap();
        (fake, handle)
    }

    fn booking_rows(fake: &FakeSheets) -> Vec<Vec<String>> {
        fake.data_rows(&TableNames::default().bookings)
    }

    #[tokio::test]
    async fn add_appends_one_row_per_student() {
        let (fake, sheet) = setup(&[]).await;

        let ids = vec!["1".to_string(), "2".to_string()];
        let added = BookingRepository::add(&sheet, "2024-05-01", &ids).await.unwrap();
        assert_eq!(added.len(), 2);

        let rows = booking_rows(&fake);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r[0] == "2024-05-01"));
        assert_eq!(rows[0], vec!["2024-05-01", "Amy", "1"]);
        assert_eq!(rows[1], vec!["2024-05-01", "Ben", "2"]);
    }

    #[tokio::test]
    async fn add_with_unknown_ids_writes_nothing() {
        let (fake, sheet) = setup(&[]).await;

        let ids = vec!["1".to_string(), "7".to_string(), "8".to_string()];
        let err = BookingRepository::add(&sheet, "2024-05-01", &ids).await.unwrap_err();
        match err {
            AppError::NotFound(msg) => assert!(msg.contains("7, 8")),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(booking_rows(&fake).is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_all_matches_bottom_up() {
        let (fake, sheet) = setup(&[
            &["2024-05-01", "Amy", "1"],
            &["2024-05-01", "Ben", "2"],
            &["2024-5-1", "Amy", "1"],
            &["2024-05-02", "Amy", "1"],
        ])
        .await;

        let removed = BookingRepository::remove(&sheet, "1", "2024-05-01").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            booking_rows(&fake),
            vec![
                vec!["2024-05-01", "Ben", "2"],
                vec!["2024-05-02", "Amy", "1"]
            ]
        );

        // data rows 2 and 0 -> grid spans [3,4) then [1,2), in that order
        let batch = &fake.batches()[0];
        let spans: Vec<(i64, i64)> = batch
            .iter()
            .map(|r| match r {
                BatchRequest::DeleteDimension(d) => (d.range.start_index, d.range.end_index),
                other => panic!("unexpected request {:?}", other),
            })
            .collect();
        assert_eq!(spans, vec![(3, 4), (1, 2)]);
    }

    #[tokio::test]
    async fn remove_without_match_is_a_no_op() {
        let (fake, sheet) = setup(&[&["2024-05-01", "Amy", "1"]]).await;
        assert_eq!(BookingRepository::remove(&sheet, "2", "2024-05-01").await.unwrap(), 0);
        assert!(fake.batches().is_empty());
        assert_eq!(booking_rows(&fake).len(), 1);
    }

    #[tokio::test]
    async fn deactivated_students_keep_their_bookings() {
        let (fake, sheet) = setup(&[&["2024-04-01", "Cy", "3"]]).await;
        let mut cy = StudentRepository::find(&sheet, "3").await.unwrap();
        cy.active = false;
        StudentRepository::update(&sheet, &cy).await.unwrap();

        assert_eq!(booking_rows(&fake), vec![vec!["2024-04-01", "Cy", "3"]]);
    }

    #[tokio::test]
    async fn rename_rewrites_denormalized_names() {
        let (fake, sheet) = setup(&[
            &["2024-05-01", "Amy", "1"],
            &["2024-05-01", "Ben", "2"],
            &["2024-05-03", "Amy", "1"],
        ])
        .await;

        let amy = Student {
            id: "1".into(),
            name: "Amelia".into(),
            instagram: String::new(),
            active: true,
        };
        assert_eq!(BookingRepository::rename_student(&sheet, &amy).await.unwrap(), 2);

        let names: Vec<String> = booking_rows(&fake).into_iter().map(|r| r[1].clone()).collect();
        assert_eq!(names, vec!["Amelia", "Ben", "Amelia"]);
    }
}
