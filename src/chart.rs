// src/chart.rs
//
// Month-keyed metric maps come back from upstream as "Month Year" → record.
// Charts need the keys in calendar order and one numeric series per line.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::filters::{FilterError, Period};
use crate::models::loan::{CoverageUtilizationMonthly, LoanDisbursementMonthly, RepaymentRiskMonthly};
use crate::models::payroll::MonthlySummary;

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Months of history shown before the selected period.
pub const DEFAULT_SPAN_MONTHS: u32 = 6;

/// "August 2025" → (2025, 8)
pub fn parse_month_label(label: &str) -> Option<(i32, u32)> {
    let (name, year) = label.trim().split_once(' ')?;
    let month = MONTH_NAMES.iter().position(|m| *m == name)? as u32 + 1;
    Some((year.trim().parse().ok()?, month))
}

/// Chronological order; labels that do not parse go last in lexical order.
pub fn sort_month_labels<'a, I>(labels: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keyed: Vec<(Option<(i32, u32)>, &str)> = labels
        .into_iter()
        .map(|l| (parse_month_label(l), l.as_str()))
        .collect();
    keyed.sort_by(|(ka, la), (kb, lb)| match (ka, kb) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => la.cmp(lb),
    });
    keyed.into_iter().map(|(_, l)| l).collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Series {
    pub name: &'static str,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartData {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

pub type Metric<T> = (&'static str, fn(&T) -> f64);

pub fn build_chart<T>(data: &HashMap<String, T>, metrics: &[Metric<T>]) -> ChartData {
    let months = sort_month_labels(data.keys());
    let series = metrics
        .iter()
        .map(|(name, pick)| Series {
            name: *name,
            data: months.iter().map(|m| pick(&data[*m])).collect(),
        })
        .collect();
    ChartData { categories: months.into_iter().map(String::from).collect(), series }
}

// ───────────────────────────────────────
// Chart views
// ───────────────────────────────────────

const PAYROLL_DISBURSED: &[Metric<MonthlySummary>] = &[("Total Disbursed", |s| s.total_disbursed)];
const PAYROLL_HEADCOUNT: &[Metric<MonthlySummary>] = &[
    ("Total Headcount", |s| s.total_headcount as f64),
    ("PKWTT Headcount", |s| s.pkwtt_headcount as f64),
    ("PKWT Headcount", |s| s.pkwt_headcount as f64),
    ("Mitra Headcount", |s| s.mitra_headcount as f64),
];

const COVERAGE_REQUESTS: &[Metric<CoverageUtilizationMonthly>] = &[
    ("Total Loan Requests", |m| m.total_loan_requests as f64),
    ("Total Approved Requests", |m| m.total_approved_requests as f64),
    ("Total Rejected Requests", |m| m.total_rejected_requests as f64),
    ("Total New Borrowers", |m| m.total_first_borrow as f64),
];
const COVERAGE_AMOUNTS: &[Metric<CoverageUtilizationMonthly>] =
    &[("Total Disbursed Amount", |m| m.total_disbursed_amount)];
const COVERAGE_RATES: &[Metric<CoverageUtilizationMonthly>] =
    &[("Penetration Rate", |m| m.penetration_rate)];

const REPAYMENT_AMOUNTS: &[Metric<RepaymentRiskMonthly>] = &[
    ("Total Expected Repayment", |m| m.total_expected_repayment),
    ("Total Loan Principal Collected", |m| m.total_loan_principal_collected),
    ("Total Unrecovered Repayment", |m| m.total_unrecovered_repayment),
    ("Admin Fee Profit", |m| m.admin_fee_profit),
];
const REPAYMENT_RATES: &[Metric<RepaymentRiskMonthly>] =
    &[("Repayment Recovery Rate", |m| m.repayment_recovery_rate)];

const DISBURSEMENT_AMOUNTS: &[Metric<LoanDisbursementMonthly>] = &[
    ("Total Disbursed Amount", |m| m.total_disbursed_amount),
    ("Average Disbursed Amount", |m| m.average_disbursed_amount),
];
const DISBURSEMENT_LOANS: &[Metric<LoanDisbursementMonthly>] =
    &[("Total Loans", |m| m.total_loans as f64)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollChartView {
    #[default]
    Disbursed,
    Headcount,
}

impl PayrollChartView {
    pub fn metrics(self) -> &'static [Metric<MonthlySummary>] {
        match self {
            Self::Disbursed => PAYROLL_DISBURSED,
            Self::Headcount => PAYROLL_HEADCOUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageChartView {
    #[default]
    Requests,
    Amounts,
    Rates,
}

impl CoverageChartView {
    pub fn metrics(self) -> &'static [Metric<CoverageUtilizationMonthly>] {
        match self {
            Self::Requests => COVERAGE_REQUESTS,
            Self::Amounts => COVERAGE_AMOUNTS,
            Self::Rates => COVERAGE_RATES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentRiskChartView {
    #[default]
    Amounts,
    Rates,
}

impl RepaymentRiskChartView {
    pub fn metrics(self) -> &'static [Metric<RepaymentRiskMonthly>] {
        match self {
            Self::Amounts => REPAYMENT_AMOUNTS,
            Self::Rates => REPAYMENT_RATES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbursementChartView {
    #[default]
    Amounts,
    Loans,
}

impl DisbursementChartView {
    pub fn metrics(self) -> &'static [Metric<LoanDisbursementMonthly>] {
        match self {
            Self::Amounts => DISBURSEMENT_AMOUNTS,
            Self::Loans => DISBURSEMENT_LOANS,
        }
    }
}

// ───────────────────────────────────────
// Default ranges
// ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartRange {
    pub start: String,
    pub end: String,
}

/// A chart plus the bounds it was fetched for.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyChart {
    pub range: ChartRange,
    pub chart: ChartData,
}

/// `MM-YYYY` bounds for the payroll monthly endpoint. Explicit bounds win;
/// otherwise the range ends at `period` and starts six months earlier.
pub fn payroll_range(
    period: Period,
    start: &str,
    end: &str,
) -> Result<(Period, Period), FilterError> {
    let end = if end.is_empty() { period } else { Period::parse_month_year(end)? };
    let start = if start.is_empty() {
        period.months_back(DEFAULT_SPAN_MONTHS)
    } else {
        Period::parse_month_year(start)?
    };
    Ok((start, end))
}

/// Date bounds for the loan monthly endpoints: first day six months back
/// through the last day of the selected (or current) month.
pub fn loan_range(
    period: Option<Period>,
    today: NaiveDate,
    start: &str,
    end: &str,
) -> Result<(NaiveDate, NaiveDate), FilterError> {
    let anchor = period.unwrap_or_else(|| Period::of(today));
    let parse = |field: &'static str, value: &str| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| FilterError::Invalid { field, value: value.to_string() })
    };
    let start = if start.is_empty() {
        anchor.months_back(DEFAULT_SPAN_MONTHS).first_day()
    } else {
        parse("start_date", start)?
    };
    let end = if end.is_empty() { anchor.last_day() } else { parse("end_date", end)? };
    Ok((start, end))
}
