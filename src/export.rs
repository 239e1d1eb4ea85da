// src/export.rs
//
// Spreadsheet export of the rows a table currently shows (searched and
// sorted, all pages).

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::filters::Period;
use crate::format;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no rows to export")]
    Empty,
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportColumn {
    pub header: String,
    pub width: f64,
}

impl ExportColumn {
    pub fn new(header: impl Into<String>, width: f64) -> Self {
        Self { header: header.into(), width }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Text(String),
    Number(f64),
}

impl From<&str> for ExportCell {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ExportCell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for ExportCell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for ExportCell {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<u32> for ExportCell {
    fn from(v: u32) -> Self {
        Self::Number(v.into())
    }
}

/// Excel rules: at most 31 chars, none of `[]:*?/\`, not blank.
pub fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// `department-summary-08-2025.xlsx`, or without the period suffix.
pub fn file_name(title: &str, period: Option<Period>) -> String {
    match period {
        Some(p) => format!("{}-{}.xlsx", format::kebab(title), p.month_year()),
        None => format!("{}.xlsx", format::kebab(title)),
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<ExportColumn>,
    pub rows: Vec<Vec<ExportCell>>,
}

impl Sheet {
    pub fn new(name: &str, columns: Vec<ExportColumn>) -> Self {
        Self { name: sheet_name(name), columns, rows: Vec::new() }
    }

    pub fn push(&mut self, row: Vec<ExportCell>) {
        self.rows.push(row);
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        if self.rows.is_empty() {
            return Err(ExportError::Empty);
        }

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.name)?;

        for (col, column) in self.columns.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(0, col, &column.header, &bold)?;
            sheet.set_column_width(col, column.width)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = i as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    ExportCell::Text(s) => sheet.write_string(r, col as u16, s)?,
                    ExportCell::Number(n) => sheet.write_number(r, col as u16, *n)?,
                };
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// A record that knows its spreadsheet layout.
pub trait ExportRow {
    fn export_columns() -> Vec<ExportColumn>;
    fn export_cells(&self) -> Vec<ExportCell>;
}

pub fn sheet<R: ExportRow>(name: &str, rows: &[&R]) -> Sheet {
    let mut sheet = Sheet::new(name, R::export_columns());
    for row in rows {
        sheet.push(row.export_cells());
    }
    sheet
}

/// Finished workbook, served as an attachment.
#[derive(Debug)]
pub struct XlsxFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl IntoResponse for XlsxFile {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.file_name),
                ),
            ],
            self.bytes,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_follow_excel_rules() {
        assert_eq!(sheet_name("Department Summary"), "Department Summary");
        assert_eq!(sheet_name("Q1/Q2 [draft]: *?"), "Q1Q2 draft");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name("[]"), "Sheet1");
    }

    #[test]
    fn file_names() {
        let p = Period::new(8, 2025);
        assert_eq!(file_name("Department Summary", p), "department-summary-08-2025.xlsx");
        assert_eq!(file_name("Clients by Total Requests", None), "clients-by-total-requests.xlsx");
    }

    #[test]
    fn writes_a_zip_container() {
        let mut sheet = Sheet::new(
            "Cost Owner Summary",
            vec![ExportColumn::new("Cost Owner", 30.0), ExportColumn::new("Total Disbursed", 18.0)],
        );
        sheet.push(vec!["Finance".into(), 1500000.0.into()]);
        let bytes = sheet.to_xlsx().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_sheet_is_refused() {
        let sheet = Sheet::new("Empty", vec![ExportColumn::new("A", 10.0)]);
        assert!(matches!(sheet.to_xlsx(), Err(ExportError::Empty)));
    }
}
