use crate::db::locator::{RowLocator, FIRST_DATA_ROW};
use crate::db::models::{NewStudent, Student};
use crate::db::store::{SheetHandle, Table};
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Repository for the student roster (Roster sheet).
pub struct StudentRepository;

impl StudentRepository {
    pub async fn list(sheet: &SheetHandle) -> AppResult<Vec<Student>> {
        let rows = sheet.fetch_rows(Table::Roster).await?;
        Ok(rows.iter().filter_map(|r| Student::from_row(r)).collect())
    }

    pub async fn find(sheet: &SheetHandle, id: &str) -> AppResult<Student> {
        Self::list(sheet)
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(i18n::t_with("student.not_found", &[("id", id)])))
    }

    /// Highest numeric id in column A, 0 for an empty roster. Non-numeric ids are ignored.
    pub async fn max_id(sheet: &SheetHandle) -> AppResult<u64> {
        let rows = sheet
            .fetch_range(Table::Roster, &format!("A{}:A", FIRST_DATA_ROW))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.first())
            .filter_map(|id| id.trim().parse::<u64>().ok())
            .max()
            .unwrap_or(0))
    }

    /// Append a new active student with id `max + 1`. Ids of deactivated
    /// students still count, so an id is never handed out twice.
    pub async fn add(sheet: &SheetHandle, new: NewStudent) -> AppResult<Student> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest(i18n::t("student.name_required")));
        }

        let id = Self::max_id(sheet).await? + 1;
        let student = Student {
            id: id.to_string(),
            name,
            instagram: new.instagram.trim().to_string(),
            active: true,
        };

        tracing::info!("Adding student {} ({})", student.id, student.name);
        sheet
            .append_rows(Table::Roster, vec![student.to_row()])
            .await?;
        sheet.sort_by_column(Table::Roster, 0).await;

        Ok(student)
    }

    /// Overwrite the roster row of `student.id` with its current values.
    pub async fn update(sheet: &SheetHandle, student: &Student) -> AppResult<()> {
        let rows = sheet.fetch_rows(Table::Roster).await?;
        let row = RowLocator::find(&rows, |r| r.first().is_some_and(|id| id.trim() == student.id))
            .ok_or_else(|| {
                AppError::NotFound(i18n::t_with("student.not_found", &[("id", student.id.as_str())]))
            })?;

        tracing::info!(
            "Updating student {} at sheet row {} (active={})",
            student.id,
            row.a1_row(),
            student.active
        );
        sheet
            .update_row(Table::Roster, row, student.to_row())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::TableNames;
    use crate::db::store::SheetStore;
    use crate::services::sheets::testing::{FakeSheets, VALID_TOKEN};

    async fn setup(rows: &[&[&str]]) -> (Arc<FakeSheets>, SheetHandle) {
        let fake = Arc::new(FakeSheets::new());
        fake.seed(&TableNames::default().roster, rows);
        let store = SheetStore::new(fake.clone(), TableNames::default());
        store.set_access_token(Some(VALID_TOKEN.into())).await;
        let handle = store.handle("spreadsheet").await.unwrap();
        (fake, handle)
    }

    #[tokio::test]
    async fn first_student_gets_id_one() {
        let (fake, sheet) = setup(&[]).await;
        let s = StudentRepository::add(
            &sheet,
            NewStudent {
                name: " Amy ".into(),
                instagram: String::new(),
            },
        )
        .await
        .unwrap();
        assert_eq!(s.id, "1");
        assert_eq!(
            fake.data_rows(&TableNames::default().roster),
            vec![vec!["1", "Amy", "", "true"]]
        );
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_sorted_numerically() {
        let (fake, sheet) = setup(&[
            &["9", "Ivy", "", "true"],
            &["10", "Jon", "", "false"],
            &["x", "Bad", "", "true"],
        ])
        .await;

        let s = StudentRepository::add(
            &sheet,
            NewStudent {
                name: "Kai".into(),
                instagram: "@kai".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(s.id, "11");

        let ids: Vec<String> = fake
            .data_rows(&TableNames::default().roster)
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(ids, vec!["9", "10", "11", "x"]);
    }

    #[tokio::test]
    async fn deactivation_keeps_id_reserved() {
        let (_fake, sheet) = setup(&[&["1", "Amy", "", "true"], &["2", "Ben", "", "true"]]).await;

        let mut ben = StudentRepository::find(&sheet, "2").await.unwrap();
        ben.active = false;
        StudentRepository::update(&sheet, &ben).await.unwrap();

        let stored = StudentRepository::find(&sheet, "2").await.unwrap();
        assert!(!stored.active);

        let next = StudentRepository::add(
            &sheet,
            NewStudent {
                name: "Cy".into(),
                instagram: String::new(),
            },
        )
        .await
        .unwrap();
        assert_eq!(next.id, "3");
    }

    #[tokio::test]
    async fn update_unknown_student_is_not_found() {
        let (_fake, sheet) = setup(&[&["1", "Amy", "", "true"]]).await;
        let ghost = Student {
            id: "42".into(),
            name: "Ghost".into(),
            instagram: String::new(),
            active: true,
        };
        assert!(matches!(
            StudentRepository::update(&sheet, &ghost).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let (fake, sheet) = setup(&[]).await;
        let err = StudentRepository::add(
            &sheet,
            NewStudent {
                name: "   ".into(),
                instagram: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(fake.data_rows(&TableNames::default().roster).is_empty());
    }
}
