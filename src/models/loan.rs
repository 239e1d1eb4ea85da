// src/models/loan.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────
// Employees & filters
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Karyawan {
    pub id_karyawan: i64,
    pub status: String,
    pub loan_kasbon_eligible: i64,
    pub klient: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KaryawanResponse {
    pub status: String,
    pub count: i64,
    #[serde(default)]
    pub results: Vec<Karyawan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoanFilterOptions {
    #[serde(default)]
    pub employers: Vec<String>,
    #[serde(default)]
    pub placements: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanFiltersResponse {
    pub status: String,
    #[serde(default)]
    pub filters: LoanFilterOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KaryawanOverdue {
    pub id_karyawan: i64,
    pub ktp: String,
    pub name: String,
    pub company: String,
    pub sourced_to: String,
    pub project: String,
    pub total_amount_owed: f64,
    pub admin_fee: f64,
    pub total_payment: f64,
    pub repayment_date: String,
    pub days_overdue: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KaryawanOverdueResponse {
    pub status: String,
    pub count: i64,
    #[serde(default)]
    pub results: Vec<KaryawanOverdue>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Coverage & utilization
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct CoverageUtilizationResponse {
    pub status: String,
    pub total_eligible_employees: i64,
    pub total_active_employees: i64,
    pub total_loan_requests: i64,
    pub penetration_rate: f64,
    pub eligible_rate: f64,
    pub total_approved_requests: i64,
    pub total_rejected_requests: i64,
    pub approval_rate: f64,
    pub total_new_borrowers: i64,
    /// days
    pub average_approval_time: f64,
    pub total_disbursed_amount: f64,
    pub average_disbursed_amount: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageUtilizationMonthly {
    pub total_first_borrow: i64,
    pub total_loan_requests: i64,
    pub total_approved_requests: i64,
    pub total_rejected_requests: i64,
    pub penetration_rate: f64,
    pub total_disbursed_amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverageUtilizationMonthlyResponse {
    pub status: String,
    #[serde(default)]
    pub monthly_data: HashMap<String, CoverageUtilizationMonthly>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Repayment risk
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentRiskResponse {
    pub status: String,
    pub total_expected_repayment: f64,
    pub total_loan_principal_collected: f64,
    pub total_admin_fee_collected: f64,
    pub total_unrecovered_repayment: f64,
    pub total_unrecovered_loan_principal: f64,
    pub total_unrecovered_admin_fee: f64,
    pub repayment_recovery_rate: f64,
    pub delinquencies_rate: f64,
    pub admin_fee_profit: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepaymentRiskMonthly {
    pub repayment_recovery_rate: f64,
    pub total_expected_repayment: f64,
    pub total_loan_principal_collected: f64,
    pub total_unrecovered_repayment: f64,
    pub admin_fee_profit: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentRiskMonthlyResponse {
    pub status: String,
    #[serde(default)]
    pub monthly_data: HashMap<String, RepaymentRiskMonthly>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Requests & disbursement
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanRequestsResponse {
    pub status: String,
    pub total_approved_requests: i64,
    pub total_rejected_requests: i64,
    pub approval_rate: f64,
    pub average_approval_time: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanDisbursementResponse {
    pub status: String,
    pub total_disbursed_amount: f64,
    pub average_disbursed_amount: f64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanDisbursementMonthly {
    pub total_disbursed_amount: f64,
    pub total_loans: i64,
    pub average_disbursed_amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanDisbursementMonthlyResponse {
    pub status: String,
    #[serde(default)]
    pub monthly_data: HashMap<String, LoanDisbursementMonthly>,
    #[serde(default)]
    pub message: Option<String>,
}

// ───────────────────────────────────────
// Purposes & clients
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanPurpose {
    pub purpose_id: i64,
    pub purpose_name: String,
    pub total_count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanPurposeResponse {
    pub status: String,
    pub count: i64,
    #[serde(default)]
    pub results: Vec<LoanPurpose>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSummary {
    pub sourced_to: String,
    pub project: String,
    pub total_disbursement: f64,
    pub total_requests: i64,
    pub approved_requests: i64,
    pub eligible_employees: i64,
    pub active_employees: i64,
    pub eligible_rate: f64,
    pub penetration_rate: f64,
    pub total_admin_fee_collected: f64,
    pub total_unrecovered_payment: f64,
    pub admin_fee_profit: f64,
    pub delinquent_requests: i64,
    pub delinquency_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientSummaryResponse {
    pub status: String,
    pub count: i64,
    #[serde(default)]
    pub results: Vec<ClientSummary>,
}
