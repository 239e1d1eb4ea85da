// src/models/payroll.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────
// Filters
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub dept_id: u32,
    pub department_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentFiltersResponse {
    pub status: String,
    #[serde(default)]
    pub departments: Vec<Department>,
}

// ───────────────────────────────────────
// Period totals
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct TotalPayrollDisbursedResponse {
    pub status: String,
    pub total_payroll_disbursed: f64,
    pub month: u32,
    pub year: i32,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalPayrollHeadcountResponse {
    pub status: String,
    pub total_headcount: i64,
    pub pkwtt_headcount: i64,
    pub pkwt_headcount: i64,
    pub mitra_headcount: i64,
    pub month: u32,
    pub year: i32,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalDepartmentCountResponse {
    pub status: String,
    pub total_department_count: i64,
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub message: Option<String>,
}

/// BPJS Ketenagakerjaan company contribution (the wire name is `total_bpsjtk`).
#[derive(Debug, Serialize, Deserialize)]
pub struct TotalBpjstkResponse {
    pub status: String,
    #[serde(rename = "total_bpsjtk")]
    pub total_bpjstk: f64,
    pub month: u32,
    pub year: i32,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalKesehatanResponse {
    pub status: String,
    pub total_kesehatan: f64,
    pub month: u32,
    pub year: i32,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalPensiunResponse {
    pub status: String,
    pub total_pensiun: f64,
    pub month: u32,
    pub year: i32,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Monthly series
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlySummary {
    pub total_disbursed: f64,
    pub total_headcount: i64,
    pub pkwtt_headcount: i64,
    pub pkwt_headcount: i64,
    pub mitra_headcount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayrollMonthlyResponse {
    pub status: String,
    /// Keyed by "August 2025" style labels.
    #[serde(default)]
    pub summaries: HashMap<String, MonthlySummary>,
    pub start_month: Option<u32>,
    pub end_month: Option<u32>,
    pub year: Option<i32>,
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Table rows
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentSummary {
    pub dept_id: u32,
    pub department_name: Option<String>,
    pub cost_owner: String,
    pub total_headcount: i64,
    pub pkwtt_headcount: i64,
    pub pkwt_headcount: i64,
    pub mitra_headcount: i64,
    pub distribution_ratio: f64,
    pub total_disbursed: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentSummaryResponse {
    pub status: String,
    #[serde(default)]
    pub departments: Vec<DepartmentSummary>,
    pub month: u32,
    pub year: i32,
    pub count: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostOwnerSummary {
    pub cost_owner: String,
    pub total_headcount: i64,
    pub pkwtt_headcount: i64,
    pub pkwt_headcount: i64,
    pub mitra_headcount: i64,
    pub distribution_ratio: f64,
    pub total_disbursed: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CostOwnerSummaryResponse {
    pub status: String,
    #[serde(default)]
    pub cost_owners: Vec<CostOwnerSummary>,
    pub month: u32,
    pub year: i32,
    pub count: i64,
    #[serde(default)]
    pub message: Option<String>,
}
