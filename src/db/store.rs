use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::TableNames;
use crate::db::locator::{RowLocator, RowRef, FIRST_DATA_ROW, HEADER_ROWS};
use crate::error::{AppError, AppResult};
use crate::services::sheets::{
    BatchRequest, DeleteDimensionRequest, Dimension, DimensionRange, GridRange, SheetsApi,
    SortOrder, SortRangeRequest, SortSpec,
};

/// The three logical tables stored in the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// A = date
    ClassDays,
    /// A = date, B = student name, C = student id
    Bookings,
    /// A = id, B = name, C = instagram, D = active
    Roster,
}

impl Table {
    /// Number of columns, starting at A.
    pub fn width(self) -> usize {
        match self {
            Table::ClassDays => 1,
            Table::Bookings => 3,
            Table::Roster => 4,
        }
    }

    pub fn last_column(self) -> char {
        column_letter(self.width() - 1)
    }
}

/// `0 -> 'A'`, `3 -> 'D'`. Tables never exceed 26 columns.
pub fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Show only the beginning of an access token in logs.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}...", prefix)
}

/// Holds the Sheets transport and the current access token.
pub struct SheetStore {
    api: Arc<dyn SheetsApi>,
    tables: TableNames,
    access_token: RwLock<Option<String>>,
}

impl SheetStore {
    pub fn new(api: Arc<dyn SheetsApi>, tables: TableNames) -> Self {
        Self {
            api,
            tables,
            access_token: RwLock::new(None),
        }
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        match &token {
            Some(t) => tracing::debug!("Access token set ({})", redact_token(t)),
            None => tracing::debug!("Access token cleared"),
        }
        *self.access_token.write().await = token;
    }

    /// Bind the current token to a spreadsheet. Fails with `Unauthorized` when no
    /// token has been set.
    pub async fn handle(&self, spreadsheet_id: &str) -> AppResult<SheetHandle> {
        let token = self
            .access_token
            .read()
            .await
            .clone()
            .ok_or(AppError::Unauthorized)?;

        Ok(SheetHandle {
            api: self.api.clone(),
            tables: self.tables.clone(),
            token,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }
}

/// Authenticated access to the tables of one spreadsheet.
#[derive(Clone)]
pub struct SheetHandle {
    api: Arc<dyn SheetsApi>,
    tables: TableNames,
    token: String,
    spreadsheet_id: String,
}

impl SheetHandle {
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn title(&self, table: Table) -> &str {
        match table {
            Table::ClassDays => &self.tables.class_days,
            Table::Bookings => &self.tables.bookings,
            Table::Roster => &self.tables.roster,
        }
    }

    fn a1(&self, table: Table, cells: &str) -> String {
        format!("{}!{}", self.title(table), cells)
    }

    /// Read `cells` (e.g. `A2:C`) of `table`.
    pub async fn fetch_range(&self, table: Table, cells: &str) -> AppResult<Vec<Vec<String>>> {
        let range = self.a1(table, cells);
        self.api
            .get_values(&self.token, &self.spreadsheet_id, &range)
            .await
            .map_err(|e| {
                tracing::error!("Error fetching {}: {}", range, e);
                e
            })
    }

    /// All data rows of `table`, header skipped. Positions map to `RowRef`s.
    pub async fn fetch_rows(&self, table: Table) -> AppResult<Vec<Vec<String>>> {
        let cells = format!("A{}:{}", FIRST_DATA_ROW, table.last_column());
        self.fetch_range(table, &cells).await
    }

    /// Resolve a sheet title to the numeric id structural requests need.
    pub async fn sheet_id(&self, table: Table) -> AppResult<i64> {
        let title = self.title(table);
        let sheets = self
            .api
            .get_sheets(&self.token, &self.spreadsheet_id)
            .await?;

        match sheets.iter().find(|s| s.title == title) {
            Some(sheet) => {
                tracing::debug!("Resolved sheet '{}' to id {}", title, sheet.sheet_id);
                Ok(sheet.sheet_id)
            }
            None => {
                tracing::error!(
                    "Sheet '{}' not found; available: {:?}",
                    title,
                    sheets.iter().map(|s| s.title.as_str()).collect::<Vec<_>>()
                );
                Err(AppError::NotFound(crate::i18n::t_with(
                    "sheet.not_found",
                    &[("sheet", title)],
                )))
            }
        }
    }

    pub async fn append_rows(&self, table: Table, rows: Vec<Vec<String>>) -> AppResult<()> {
        let range = self.a1(table, &format!("A:{}", table.last_column()));
        tracing::debug!("Appending {} row(s) to {}", rows.len(), range);
        self.api
            .append_values(&self.token, &self.spreadsheet_id, &range, rows)
            .await
    }

    /// Overwrite a whole data row.
    pub async fn update_row(&self, table: Table, row: RowRef, values: Vec<String>) -> AppResult<()> {
        let n = row.a1_row();
        let range = self.a1(table, &format!("A{}:{}{}", n, table.last_column(), n));
        tracing::debug!("Updating {}", range);
        self.api
            .update_values(&self.token, &self.spreadsheet_id, &range, vec![values])
            .await
    }

    /// Overwrite a single cell of a data row.
    pub async fn update_cell(
        &self,
        table: Table,
        column: usize,
        row: RowRef,
        value: String,
    ) -> AppResult<()> {
        let range = self.a1(table, &format!("{}{}", column_letter(column), row.a1_row()));
        tracing::debug!("Updating {}", range);
        self.api
            .update_values(&self.token, &self.spreadsheet_id, &range, vec![vec![value]])
            .await
    }

    /// Delete the given rows in one batch, bottom-up.
    pub async fn delete_rows(&self, table: Table, rows: Vec<RowRef>) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sheet_id = self.sheet_id(table).await?;
        let requests: Vec<BatchRequest> = RowLocator::deletion_order(rows)
            .into_iter()
            .map(|row| {
                let (start_index, end_index) = row.grid_span();
                BatchRequest::DeleteDimension(DeleteDimensionRequest {
                    range: DimensionRange {
                        sheet_id,
                        dimension: Dimension::Rows,
                        start_index,
                        end_index,
                    },
                })
            })
            .collect();

        let count = requests.len();
        tracing::debug!("Deleting {} row(s) from {}", count, self.title(table));
        self.api
            .batch_update(&self.token, &self.spreadsheet_id, requests)
            .await?;
        Ok(count)
    }

    /// Sort the data rows of `table` ascending by `column`.
    ///
    /// Runs after a write that already succeeded, so failures are logged and swallowed.
    pub async fn sort_by_column(&self, table: Table, column: usize) {
        let result = async {
            let sheet_id = self.sheet_id(table).await?;
            let request = BatchRequest::SortRange(SortRangeRequest {
                range: GridRange {
                    sheet_id,
                    start_row_index: Some(HEADER_ROWS as i64),
                    end_row_index: None,
                    start_column_index: 0,
                    end_column_index: table.width() as i64,
                },
                sort_specs: vec![SortSpec {
                    dimension_index: column as i64,
                    sort_order: SortOrder::Ascending,
                }],
            });
            self.api
                .batch_update(&self.token, &self.spreadsheet_id, vec![request])
                .await
        }
        .await;

        match result {
            Ok(()) => tracing::debug!("Sorted {} by column {}", self.title(table), column),
            Err(e) => tracing::warn!(
                "Failed to sort {} (the write itself succeeded): {}",
                self.title(table),
                e
            ),
        }
    }
}
