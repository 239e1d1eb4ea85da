// src/table.rs
//
// In-memory table engine: search, single-column sort, fixed-size pages.
// Rows arrive whole from upstream; nothing here goes back over the wire.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROWS_PER_PAGE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("unknown sort column {0:?}")]
    UnknownColumn(String),
    #[error("invalid sort order {0:?} (expected asc or desc)")]
    InvalidOrder(String),
    #[error("invalid page {0:?}")]
    InvalidPage(String),
    #[error("rows_per_page must be one of 10, 25, 50, 100 (got {0:?})")]
    InvalidRowsPerPage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    fn parse(value: &str) -> Result<Self, TableError> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(TableError::InvalidOrder(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub numeric: bool,
}

impl Column {
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self { key, label, numeric: false }
    }

    pub const fn number(key: &'static str, label: &'static str) -> Self {
        Self { key, label, numeric: true }
    }
}

/// Unformatted rendering of a cell.
pub fn plain(value: CellValue) -> String {
    match value {
        CellValue::Text(s) => s,
        CellValue::Number(n) => n.to_string(),
    }
}

pub trait TableRow {
    fn columns() -> &'static [Column];

    /// Sort key of `key`; unknown keys never reach here.
    fn value(&self, key: &str) -> CellValue;

    /// What the cell shows.
    fn display(&self, key: &str) -> String {
        plain(self.value(key))
    }

    /// Search hits either the shown text ("25.00%") or the raw value ("0.25").
    fn matches(&self, needle: &str) -> bool {
        Self::columns().iter().any(|c| {
            self.display(c.key).to_lowercase().contains(needle)
                || plain(self.value(c.key)).to_lowercase().contains(needle)
        })
    }
}

/// Raw query-string form of the table controls; empty means default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableQuery {
    pub sort_by: String,
    pub order: String,
    pub search: String,
    pub page: String,
    pub rows_per_page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sort {
    pub column: &'static str,
    pub order: SortOrder,
}

/// Validated table controls.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub sort: Sort,
    pub search: String,
    pub page: usize,
    pub rows_per_page: usize,
}

impl TableState {
    pub fn resolve<R: TableRow>(
        query: &TableQuery,
        default_sort: Sort,
        default_rows_per_page: usize,
    ) -> Result<Self, TableError> {
        let sort = if query.sort_by.is_empty() {
            Sort {
                order: if query.order.is_empty() { default_sort.order } else { SortOrder::parse(&query.order)? },
                ..default_sort
            }
        } else {
            let column = R::columns()
                .iter()
                .find(|c| c.key == query.sort_by)
                .ok_or_else(|| TableError::UnknownColumn(query.sort_by.clone()))?;
            let order = if query.order.is_empty() { SortOrder::Asc } else { SortOrder::parse(&query.order)? };
            Sort { column: column.key, order }
        };

        let page = if query.page.is_empty() {
            0
        } else {
            query.page.trim().parse().map_err(|_| TableError::InvalidPage(query.page.clone()))?
        };

        let rows_per_page = if query.rows_per_page.is_empty() {
            default_rows_per_page
        } else {
            query
                .rows_per_page
                .trim()
                .parse()
                .ok()
                .filter(|n| ROWS_PER_PAGE_OPTIONS.contains(n))
                .ok_or_else(|| TableError::InvalidRowsPerPage(query.rows_per_page.clone()))?
        };

        Ok(Self { sort, search: query.search.trim().to_lowercase(), page, rows_per_page })
    }
}

pub fn search<'a, R: TableRow>(rows: &'a [R], needle: &str) -> Vec<&'a R> {
    let needle = needle.to_lowercase();
    rows.iter().filter(|r| needle.is_empty() || r.matches(&needle)).collect()
}

/// Stable ascending sort; descending is its exact reverse.
pub fn sort<R: TableRow>(rows: &mut [&R], sort: &Sort) {
    rows.sort_by(|a, b| a.value(sort.column).compare(&b.value(sort.column)));
    if sort.order == SortOrder::Desc {
        rows.reverse();
    }
}

/// Zero-based; a page past the end is empty.
pub fn page<T>(rows: &[T], page: usize, rows_per_page: usize) -> &[T] {
    let start = page.saturating_mul(rows_per_page).min(rows.len());
    let end = start.saturating_add(rows_per_page).min(rows.len());
    &rows[start..end]
}

/// Search + sort: the row set both the page and the export are cut from.
pub fn prepare<'a, R: TableRow>(rows: &'a [R], state: &TableState) -> Vec<&'a R> {
    let mut matched = search(rows, &state.search);
    sort(&mut matched, &state.sort);
    matched
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub value: CellValue,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView<T: Serialize> {
    pub columns: &'static [Column],
    pub rows: Vec<Vec<Cell>>,
    pub total_rows: usize,
    pub page: usize,
    pub page_count: usize,
    pub rows_per_page: usize,
    pub rows_per_page_options: [usize; 4],
    pub sort: Sort,
    pub search: String,
    /// Footer totals over every matched row, not just this page.
    pub totals: T,
}

pub fn view<R: TableRow, T: Serialize>(prepared: &[&R], state: &TableState, totals: T) -> TableView<T> {
    let rows = page(prepared, state.page, state.rows_per_page)
        .iter()
        .map(|row| {
            R::columns()
                .iter()
                .map(|c| Cell { value: row.value(c.key), display: row.display(c.key) })
                .collect()
        })
        .collect();

    TableView {
        columns: R::columns(),
        rows,
        total_rows: prepared.len(),
        page: state.page,
        page_count: prepared.len().div_ceil(state.rows_per_page),
        rows_per_page: state.rows_per_page,
        rows_per_page_options: ROWS_PER_PAGE_OPTIONS,
        sort: state.sort.clone(),
        search: state.search.clone(),
        totals,
    }
}
