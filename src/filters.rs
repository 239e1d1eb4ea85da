// src/filters.rs

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::MONTH_NAMES;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

fn invalid(field: &'static str, value: &str) -> FilterError {
    FilterError::Invalid { field, value: value.to_string() }
}

// ───────────────────────────────────────
// Period
// ───────────────────────────────────────

/// A calendar month of a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Parses the form values `month` ("08" or "8") and `year` ("2025").
    pub fn parse(month: &str, year: &str) -> Result<Self, FilterError> {
        let m: u32 = month.trim().parse().map_err(|_| invalid("month", month))?;
        let y: i32 = year.trim().parse().map_err(|_| invalid("year", year))?;
        if !(1900..=9999).contains(&y) {
            return Err(invalid("year", year));
        }
        Self::new(m, y).ok_or_else(|| invalid("month", month))
    }

    /// Parses the `MM-YYYY` form used by the monthly payroll endpoints.
    pub fn parse_month_year(value: &str) -> Result<Self, FilterError> {
        let (m, y) = value
            .split_once('-')
            .ok_or_else(|| invalid("month range", value))?;
        Self::parse(m, y).map_err(|_| invalid("month range", value))
    }

    pub fn months_back(self, n: u32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 - n as i32;
        Self { year: index.div_euclid(12), month: index.rem_euclid(12) as u32 + 1 }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(self) -> NaiveDate {
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        next.and_then(|d| d.pred_opt()).unwrap_or_default()
    }

    /// "08"
    pub fn month_param(self) -> String {
        format!("{:02}", self.month)
    }

    /// "08-2025"
    pub fn month_year(self) -> String {
        format!("{:02}-{}", self.month, self.year)
    }

    /// "August 2025"
    pub fn label(self) -> String {
        format!("{} {}", MONTH_NAMES[self.month as usize - 1], self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.month_year())
    }
}

// ───────────────────────────────────────
// Enumerated filter codes
// ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractStatus {
    Dw,
    Pkwtt,
    Pkwt,
    Mitra,
}

impl ContractStatus {
    pub const ALL: [Self; 4] = [Self::Dw, Self::Pkwtt, Self::Pkwt, Self::Mitra];

    pub fn code(self) -> u32 {
        match self {
            Self::Dw => 0,
            Self::Pkwtt => 1,
            Self::Pkwt => 2,
            Self::Mitra => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dw => "DW",
            Self::Pkwtt => "PKWTT",
            Self::Pkwt => "PKWT",
            Self::Mitra => "MITRA",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

/// Internal entity / subsidiary code scoping payroll queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValdoInc {
    Vi,
    Vsdm,
    Vsi,
    Topan,
}

impl ValdoInc {
    pub const ALL: [Self; 4] = [Self::Vi, Self::Vsdm, Self::Vsi, Self::Topan];

    pub fn code(self) -> u32 {
        match self {
            Self::Vi => 1,
            Self::Vsdm => 2,
            Self::Vsi => 31,
            Self::Topan => 94,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Vi => "VI",
            Self::Vsdm => "VSDM",
            Self::Vsi => "VSI",
            Self::Topan => "TOPAN",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    #[default]
    Kasbon,
    Extradana,
    AkuCicil,
}

impl LoanType {
    pub const ALL: [Self; 3] = [Self::Kasbon, Self::Extradana, Self::AkuCicil];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kasbon => "kasbon",
            Self::Extradana => "extradana",
            Self::AkuCicil => "aku_cicil",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kasbon => "Kasbon",
            Self::Extradana => "Extradana",
            Self::AkuCicil => "Aku Cicil",
        }
    }

    pub fn parse(value: &str) -> Result<Self, FilterError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| invalid("loan_type", value))
    }
}

/// Which payroll family a page reads from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollScope {
    Internal,
    External,
}

impl PayrollScope {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Internal => "internal_payroll",
            Self::External => "external_payroll",
        }
    }

    pub fn widget(self, name: &str) -> String {
        format!("{}.{name}", self.prefix())
    }
}

fn optional_code<T>(
    field: &'static str,
    value: &str,
    from_code: impl Fn(u32) -> Option<T>,
) -> Result<Option<T>, FilterError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .trim()
        .parse()
        .ok()
        .and_then(from_code)
        .map(Some)
        .ok_or_else(|| invalid(field, value))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

// ───────────────────────────────────────
// Filter panels
// ───────────────────────────────────────

/// Shared contract of every filter panel: a change hands back the whole
/// updated filter object, and month+year gate any fetch.
pub trait FilterPanel: Clone {
    type Field: Copy;

    fn set(&mut self, field: Self::Field, value: String);
    fn month_year(&self) -> (&str, &str);

    fn is_ready(&self) -> bool {
        let (month, year) = self.month_year();
        !month.is_empty() && !year.is_empty()
    }

    fn on_change(&self, field: Self::Field, value: String) -> Self {
        let mut next = self.clone();
        next.set(field, value);
        next
    }

    /// `Ok(None)` while month or year is still unset.
    fn period(&self) -> Result<Option<Period>, FilterError> {
        if !self.is_ready() {
            return Ok(None);
        }
        let (month, year) = self.month_year();
        Period::parse(month, year).map(Some)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollFilters {
    pub month: String,
    pub year: String,
    /// dept_id as text, empty for all departments
    pub department: String,
    pub status_kontrak: String,
    pub valdo_inc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollField {
    Month,
    Year,
    Department,
    StatusKontrak,
    ValdoInc,
}

impl PayrollFilters {
    pub fn dept_id(&self) -> Result<Option<u32>, FilterError> {
        optional_code("department", &self.department, Some)
    }

    pub fn contract_status(&self) -> Result<Option<ContractStatus>, FilterError> {
        optional_code("status_kontrak", &self.status_kontrak, ContractStatus::from_code)
    }

    pub fn entity(&self) -> Result<Option<ValdoInc>, FilterError> {
        optional_code("valdo_inc", &self.valdo_inc, ValdoInc::from_code)
    }
}

impl FilterPanel for PayrollFilters {
    type Field = PayrollField;

    fn set(&mut self, field: PayrollField, value: String) {
        match field {
            PayrollField::Month => self.month = value,
            PayrollField::Year => self.year = value,
            PayrollField::Department => self.department = value,
            PayrollField::StatusKontrak => self.status_kontrak = value,
            PayrollField::ValdoInc => self.valdo_inc = value,
        }
    }

    fn month_year(&self) -> (&str, &str) {
        (&self.month, &self.year)
    }
}

/// Month/year panel of the department and cost-owner pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthYearFilters {
    pub month: String,
    pub year: String,
    pub status_kontrak: String,
    pub valdo_inc: String,
}

impl MonthYearFilters {
    pub fn contract_status(&self) -> Result<Option<ContractStatus>, FilterError> {
        optional_code("status_kontrak", &self.status_kontrak, ContractStatus::from_code)
    }

    pub fn entity(&self) -> Result<Option<ValdoInc>, FilterError> {
        optional_code("valdo_inc", &self.valdo_inc, ValdoInc::from_code)
    }
}

impl FilterPanel for MonthYearFilters {
    type Field = PayrollField;

    fn set(&mut self, field: PayrollField, value: String) {
        match field {
            PayrollField::Month => self.month = value,
            PayrollField::Year => self.year = value,
            PayrollField::StatusKontrak => self.status_kontrak = value,
            PayrollField::ValdoInc => self.valdo_inc = value,
            PayrollField::Department => {}
        }
    }

    fn month_year(&self) -> (&str, &str) {
        (&self.month, &self.year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanFilters {
    pub loan_type: String,
    pub month: String,
    pub year: String,
    pub employer: String,
    /// Sent upstream as `sourced_to` (or `placement` on /loan/filters).
    pub placement: String,
    pub project: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanField {
    LoanType,
    Month,
    Year,
    Employer,
    Placement,
    Project,
}

impl LoanFilters {
    /// Loan type is a mandatory selector that defaults to kasbon.
    pub fn loan_type(&self) -> Result<LoanType, FilterError> {
        if self.loan_type.is_empty() {
            Ok(LoanType::default())
        } else {
            LoanType::parse(&self.loan_type)
        }
    }

    pub fn employer(&self) -> Option<String> {
        non_empty(&self.employer)
    }

    pub fn placement(&self) -> Option<String> {
        non_empty(&self.placement)
    }

    pub fn project(&self) -> Option<String> {
        non_empty(&self.project)
    }
}

impl FilterPanel for LoanFilters {
    type Field = LoanField;

    fn set(&mut self, field: LoanField, value: String) {
        match field {
            LoanField::LoanType => self.loan_type = value,
            LoanField::Month => self.month = value,
            LoanField::Year => self.year = value,
            LoanField::Employer => self.employer = value,
            LoanField::Placement => self.placement = value,
            LoanField::Project => self.project = value,
        }
    }

    fn month_year(&self) -> (&str, &str) {
        (&self.month, &self.year)
    }
}

// ───────────────────────────────────────
// Option lists
// ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }
}

pub fn month_options() -> Vec<SelectOption> {
    MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| SelectOption::new(format!("{:02}", i + 1), *name))
        .collect()
}

/// The given year and the five before it, newest first.
pub fn year_options(current_year: i32) -> Vec<SelectOption> {
    (0..6)
        .map(|i| {
            let y = (current_year - i).to_string();
            SelectOption::new(y.clone(), y)
        })
        .collect()
}

/// Every month of the current and previous year as `MM-YYYY`, most recent first.
pub fn month_year_options(current_year: i32) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = (current_year - 1..=current_year)
        .flat_map(|year| (1..=12).map(move |month| Period { year, month }))
        .map(|p| SelectOption::new(p.month_year(), p.label()))
        .collect();
    options.reverse();
    options
}

pub fn contract_options() -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "All Contracts"))
        .chain(ContractStatus::ALL.iter().map(|s| SelectOption::new(s.code().to_string(), s.label())))
        .collect()
}

pub fn entity_options() -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "All"))
        .chain(ValdoInc::ALL.iter().map(|v| SelectOption::new(v.code().to_string(), v.label())))
        .collect()
}

pub fn loan_type_options() -> Vec<SelectOption> {
    LoanType::ALL
        .iter()
        .map(|t| SelectOption::new(t.as_str(), t.label()))
        .collect()
}
