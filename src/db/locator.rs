//! Translation between positions in a fetched data-row slice and sheet rows.
//!
//! Every table keeps a single header row, data is always read starting at A2,
//! and the API addresses rows two different ways: 1-based in A1 notation and
//! 0-based in grid ranges. All of that arithmetic lives here.

/// Rows above the first data row.
pub const HEADER_ROWS: usize = 1;

/// 1-based row number of the first data row (`A2`).
pub const FIRST_DATA_ROW: usize = HEADER_ROWS + 1;

/// Logical reference to one data row of a table, as seen in the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowRef {
    data_index: usize,
}

impl RowRef {
    /// Row at position `data_index` of the rows returned for `A2:...`.
    pub fn from_data_index(data_index: usize) -> Self {
        Self { data_index }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }

    /// 1-based row number for A1 ranges (`Sheet!A{n}:D{n}`).
    pub fn a1_row(&self) -> usize {
        self.data_index + FIRST_DATA_ROW
    }

    /// Zero-based, half-open `[start, end)` grid span covering this row.
    pub fn grid_span(&self) -> (i64, i64) {
        let start = (self.a1_row() - 1) as i64;
        (start, start + 1)
    }
}

pub struct RowLocator;

impl RowLocator {
    /// First row matching `pred`.
    pub fn find<F>(rows: &[Vec<String>], mut pred: F) -> Option<RowRef>
    where
        F: FnMut(&[String]) -> bool,
    {
        rows.iter()
            .position(|row| pred(row))
            .map(RowRef::from_data_index)
    }

    /// Every row matching `pred`, in sheet order.
    pub fn find_all<F>(rows: &[Vec<String>], mut pred: F) -> Vec<RowRef>
    where
        F: FnMut(&[String]) -> bool,
    {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| pred(row))
            .map(|(i, _)| RowRef::from_data_index(i))
            .collect()
    }

    /// Order rows bottom-up so that deleting one never shifts the ones still pending.
    pub fn deletion_order(mut rows: Vec<RowRef>) -> Vec<RowRef> {
        rows.sort_unstable_by(|a, b| b.cmp(a));
        rows.dedup();
        rows
    }
}
