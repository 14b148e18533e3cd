use crate::dates::{normalize_cell, normalize_date};
use crate::db::locator::RowLocator;
use crate::db::models::ClassDay;
use crate::db::store::{SheetHandle, Table};
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Repository for open class days (ClassDays sheet).
pub struct ClassDayRepository;

impl ClassDayRepository {
    pub async fn list(sheet: &SheetHandle) -> AppResult<Vec<ClassDay>> {
        let rows = sheet.fetch_rows(Table::ClassDays).await?;
        Ok(rows.iter().filter_map(|r| ClassDay::from_row(r)).collect())
    }

    /// Open a class day. Fails with `Duplicate` when a row with the same
    /// normalized date exists; the table is left untouched in that case.
    pub async fn add(sheet: &SheetHandle, date: &str) -> AppResult<ClassDay> {
        let date = normalize_date(date)?;

        let rows = sheet.fetch_rows(Table::ClassDays).await?;
        if RowLocator::find(&rows, |r| same_date(r, &date)).is_some() {
            tracing::info!("Class day {} already exists", date);
            return Err(AppError::Duplicate(i18n::t_with(
                "class_day.already_open",
                &[("date", date.as_str())],
            )));
        }

        tracing::info!("Adding class day {}", date);
        sheet
            .append_rows(Table::ClassDays, vec![vec![date.clone()]])
            .await?;
        sheet.sort_by_column(Table::ClassDays, 0).await;

        Ok(ClassDay { date })
    }

    /// Remove the first row whose normalized date matches.
    ///
    /// Bookings referencing the date are not checked here.
    pub async fn delete(sheet: &SheetHandle, date: &str) -> AppResult<()> {
        let date = normalize_date(date)?;

        let rows = sheet.fetch_rows(Table::ClassDays).await?;
        let row = RowLocator::find(&rows, |r| same_date(r, &date)).ok_or_else(|| {
            AppError::NotFound(i18n::t_with("class_day.not_found", &[("date", date.as_str())]))
        })?;

        tracing::info!("Deleting class day {} at sheet row {}", date, row.a1_row());
        sheet.delete_rows(Table::ClassDays, vec![row]).await?;
        Ok(())
    }
}

fn same_date(row: &[String], date: &str) -> bool {
    row.first().is_some_and(|c| normalize_cell(c) == date)
}
