use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Raw access to the Google Sheets v4 REST API.
///
/// Every call carries the caller's bearer token; the implementation turns an
/// HTTP 401 into `AppError::Unauthorized` and any other non-2xx answer into
/// `AppError::Remote` with the upstream message.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read an A1 range (`Sheet!A2:C`). Missing trailing cells and rows are omitted.
    async fn get_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> AppResult<Vec<Vec<String>>>;

    /// Append rows after the last row of the table found in `range`.
    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> AppResult<()>;

    /// Overwrite the cells of `range`.
    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> AppResult<()>;

    /// List the sheets (tabs) of the spreadsheet.
    async fn get_sheets(&self, token: &str, spreadsheet_id: &str)
        -> AppResult<Vec<SheetProperties>>;

    /// Apply structural requests in order, atomically on Google's side.
    async fn batch_update(
        &self,
        token: &str,
        spreadsheet_id: &str,
        requests: Vec<BatchRequest>,
    ) -> AppResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

/// One entry of a `spreadsheets.batchUpdate` call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BatchRequest {
    DeleteDimension(DeleteDimensionRequest),
    SortRange(SortRangeRequest),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeleteDimensionRequest {
    pub range: DimensionRange,
}

/// Half-open, zero-based span of rows `[start_index, end_index)` in a sheet.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i64,
    pub dimension: Dimension,
    pub start_index: i64,
    pub end_index: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Rows,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SortRangeRequest {
    pub range: GridRange,
    pub sort_specs: Vec<SortSpec>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_row_index: Option<i64>,
    pub start_column_index: i64,
    pub end_column_index: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub dimension_index: i64,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Ascending,
}

#[derive(Debug, Serialize)]
struct BatchUpdateBody<'a> {
    requests: &'a [BatchRequest],
}

/// reqwest-backed `SheetsApi`.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    fn auth_header(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Map a non-successful response onto the error taxonomy.
    async fn check(response: reqwest::Response, action: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!("Google Sheets rejected the access token while trying to {}", action);
            return Err(AppError::Unauthorized);
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleErrorResponse>(&error_text)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());

        tracing::error!(
            "Google Sheets API error while trying to {} ({}): {}",
            action,
            status,
            error_text
        );
        Err(AppError::Remote(format!(
            "Failed to {}: {} {}",
            action,
            status.as_u16(),
            message
        )))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> AppResult<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.values_url(spreadsheet_id, range))
            .header("Authorization", Self::auth_header(token))
            .send()
            .await?;

        let response = Self::check(response, "fetch sheet data").await?;
        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse sheet data: {}", e)))?;

        Ok(body.values)
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> AppResult<()> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(spreadsheet_id, range)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(token))
            .json(&ValueRange {
                range: None,
                values,
            })
            .send()
            .await?;

        Self::check(response, "append rows").await?;
        Ok(())
    }

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> AppResult<()> {
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(spreadsheet_id, range)
        );

        let response = self
            .client
            .put(&url)
            .header("Authorization", Self::auth_header(token))
            .json(&ValueRange {
                range: Some(range.to_string()),
                values,
            })
            .send()
            .await?;

        Self::check(response, "update range").await?;
        Ok(())
    }

    async fn get_sheets(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> AppResult<Vec<SheetProperties>> {
        let url = format!(
            "{}?fields=sheets.properties",
            self.spreadsheet_url(spreadsheet_id)
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", Self::auth_header(token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = Self::check(response, "fetch spreadsheet info").await?;
        let body: SpreadsheetResponse = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse spreadsheet info: {}", e)))?;

        Ok(body.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn batch_update(
        &self,
        token: &str,
        spreadsheet_id: &str,
        requests: Vec<BatchRequest>,
    ) -> AppResult<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));

        let response = self
            .client
            .post(&url)
            .header("Authorization", Self::auth_header(token))
            .json(&BatchUpdateBody {
                requests: &requests,
            })
            .send()
            .await?;

        Self::check(response, "apply batch update").await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory spreadsheet that applies requests the way the real API does.

    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub const VALID_TOKEN: &str = "valid-token";

    struct FakeSheet {
        sheet_id: i64,
        /// Grid rows, header included at index 0.
        rows: Vec<Vec<String>>,
    }

    pub struct FakeSheets {
        sheets: Mutex<BTreeMap<String, FakeSheet>>,
        batches: Mutex<Vec<Vec<BatchRequest>>>,
        fail_sorts: AtomicBool,
    }

    /// Column letter(s) + optional row number, e.g. `A2` or `C`.
    fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
        let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        if letters.is_empty() {
            return None;
        }
        let col = letters
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1;
        let digits = &cell[letters.len()..];
        let row = if digits.is_empty() {
            None
        } else {
            Some(digits.parse::<usize>().ok()?)
        };
        Some((col, row))
    }

    struct A1 {
        title: String,
        start_col: usize,
        start_row: Option<usize>,
        end_col: usize,
        end_row: Option<usize>,
    }

    fn parse_range(range: &str) -> AppResult<A1> {
        let bad = || AppError::Remote(format!("Unable to parse range: {}", range));
        let (title, cells) = range.split_once('!').ok_or_else(bad)?;
        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_col, start_row) = parse_cell(start).ok_or_else(bad)?;
        let (end_col, end_row) = parse_cell(end).ok_or_else(bad)?;
        Ok(A1 {
            title: title.to_string(),
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    fn sort_key_cmp(a: &str, b: &str) -> std::cmp::Ordering {
        match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            _ => a.cmp(b),
        }
    }

    impl FakeSheets {
        /// Spreadsheet with the three default tabs, each holding only a header row.
        pub fn new() -> Self {
            let tables = crate::config::TableNames::default();
            let fake = Self {
                sheets: Mutex::new(BTreeMap::new()),
                batches: Mutex::new(Vec::new()),
                fail_sorts: AtomicBool::new(false),
            };
            fake.add_sheet(&tables.class_days, 101, &["date"]);
            fake.add_sheet(&tables.bookings, 202, &["date", "name", "studentId"]);
            fake.add_sheet(&tables.roster, 303, &["id", "name", "instagram", "active"]);
            fake
        }

        pub fn add_sheet(&self, title: &str, sheet_id: i64, header: &[&str]) {
            self.sheets.lock().unwrap().insert(
                title.to_string(),
                FakeSheet {
                    sheet_id,
                    rows: vec![header.iter().map(|s| s.to_string()).collect()],
                },
            );
        }

        /// Append data rows directly, bypassing the API.
        pub fn seed(&self, title: &str, rows: &[&[&str]]) {
            let mut sheets = self.sheets.lock().unwrap();
            let sheet = sheets.get_mut(title).expect("unknown sheet");
            for row in rows {
                sheet.rows.push(row.iter().map(|s| s.to_string()).collect());
            }
        }

        /// Data rows (header excluded) as currently stored.
        pub fn data_rows(&self, title: &str) -> Vec<Vec<String>> {
            let sheets = self.sheets.lock().unwrap();
            sheets
                .get(title)
                .map(|s| s.rows.iter().skip(1).cloned().collect())
                .unwrap_or_default()
        }

        pub fn batches(&self) -> Vec<Vec<BatchRequest>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn set_fail_sorts(&self, fail: bool) {
            self.fail_sorts.store(fail, Ordering::SeqCst);
        }

        fn authorize(token: &str) -> AppResult<()> {
            if token == VALID_TOKEN {
                Ok(())
            } else {
                Err(AppError::Unauthorized)
            }
        }

        fn apply(sheet: &mut FakeSheet, request: &BatchRequest) -> AppResult<()> {
            match request {
                BatchRequest::DeleteDimension(req) => {
                    let start = req.range.start_index as usize;
                    let end = req.range.end_index as usize;
                    if start >= end || end > sheet.rows.len() {
                        return Err(AppError::Remote(format!(
                            "Invalid deleteDimension range {}..{} for {} rows",
                            start,
                            end,
                            sheet.rows.len()
                        )));
                    }
                    sheet.rows.drain(start..end);
                }
                BatchRequest::SortRange(req) => {
                    let start = req.range.start_row_index.unwrap_or(0) as usize;
                    let end = req
                        .range
                        .end_row_index
                        .map(|e| e as usize)
                        .unwrap_or(sheet.rows.len())
                        .min(sheet.rows.len());
                    if start < end {
                        let col = req.sort_specs[0].dimension_index as usize;
                        sheet.rows[start..end].sort_by(|a, b| {
                            let x = a.get(col).map(String::as_str).unwrap_or("");
                            let y = b.get(col).map(String::as_str).unwrap_or("");
                            sort_key_cmp(x, y)
                        });
                    }
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SheetsApi for FakeSheets {
        async fn get_values(
            &self,
            token: &str,
            _spreadsheet_id: &str,
            range: &str,
        ) -> AppResult<Vec<Vec<String>>> {
            Self::authorize(token)?;
            let a1 = parse_range(range)?;
            let sheets = self.sheets.lock().unwrap();
            let sheet = sheets
                .get(&a1.title)
                .ok_or_else(|| AppError::Remote(format!("Unable to parse range: {}", range)))?;

            let first = a1.start_row.unwrap_or(1) - 1;
            let last = a1.end_row.unwrap_or(sheet.rows.len()).min(sheet.rows.len());
            let mut out: Vec<Vec<String>> = Vec::new();
            for row in sheet.rows.iter().take(last).skip(first) {
                let mut cells: Vec<String> = (a1.start_col..=a1.end_col)
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                out.push(cells);
            }
            while out.last().is_some_and(|r| r.is_empty()) {
                out.pop();
            }
            Ok(out)
        }

        async fn append_values(
            &self,
            token: &str,
            _spreadsheet_id: &str,
            range: &str,
            values: Vec<Vec<String>>,
        ) -> AppResult<()> {
            Self::authorize(token)?;
            let a1 = parse_range(range)?;
            let mut sheets = self.sheets.lock().unwrap();
            let sheet = sheets
                .get_mut(&a1.title)
                .ok_or_else(|| AppError::Remote(format!("Unable to parse range: {}", range)))?;
            sheet.rows.extend(values);
            Ok(())
        }

        async fn update_values(
            &self,
            token: &str,
            _spreadsheet_id: &str,
            range: &str,
            values: Vec<Vec<String>>,
        ) -> AppResult<()> {
            Self::authorize(token)?;
            let a1 = parse_range(range)?;
            let mut sheets = self.sheets.lock().unwrap();
            let sheet = sheets
                .get_mut(&a1.title)
                .ok_or_else(|| AppError::Remote(format!("Unable to parse range: {}", range)))?;

            let first = a1.start_row.unwrap_or(1) - 1;
            for (offset, row) in values.into_iter().enumerate() {
                let index = first + offset;
                while sheet.rows.len() <= index {
                    sheet.rows.push(Vec::new());
                }
                let target = &mut sheet.rows[index];
                for (c, value) in row.into_iter().enumerate() {
                    let col = a1.start_col + c;
                    if target.len() <= col {
                        target.resize(col + 1, String::new());
                    }
                    target[col] = value;
                }
            }
            Ok(())
        }

        async fn get_sheets(
            &self,
            token: &str,
            _spreadsheet_id: &str,
        ) -> AppResult<Vec<SheetProperties>> {
            Self::authorize(token)?;
            let sheets = self.sheets.lock().unwrap();
            Ok(sheets
                .iter()
                .map(|(title, s)| SheetProperties {
                    sheet_id: s.sheet_id,
                    title: title.clone(),
                })
                .collect())
        }

        async fn batch_update(
            &self,
            token: &str,
            _spreadsheet_id: &str,
            requests: Vec<BatchRequest>,
        ) -> AppResult<()> {
            Self::authorize(token)?;
            if self.fail_sorts.load(Ordering::SeqCst)
                && requests
                    .iter()
                    .any(|r| matches!(r, BatchRequest::SortRange(_)))
            {
                return Err(AppError::Remote("Sorting is not allowed".to_string()));
            }
            self.batches.lock().unwrap().push(requests.clone());

            let mut sheets = self.sheets.lock().unwrap();
            for request in &requests {
                let sheet_id = match request {
                    BatchRequest::DeleteDimension(r) => r.range.sheet_id,
                    BatchRequest::SortRange(r) => r.range.sheet_id,
                };
                let sheet = sheets
                    .values_mut()
                    .find(|s| s.sheet_id == sheet_id)
                    .ok_or_else(|| AppError::Remote(format!("No grid with id: {}", sheet_id)))?;
                Self::apply(sheet, request)?;
            }
            Ok(())
        }
    }
}
