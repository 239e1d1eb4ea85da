// src/routes/loan.rs
//
// Loan portfolio pages (kasbon, extradana, aku cicil). The loan type rides
// in the query string and defaults to kasbon.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::chart::{
    self, ChartRange, CoverageChartView, DisbursementChartView, MonthlyChart, RepaymentRiskChartView,
};
use crate::client::loan::{
    ClientSummaryParams, KaryawanParams, LoanFilterParams, LoanPeriodParams, LoanRangeParams, LoanScope,
};
use crate::export::{self, ExportCell, ExportColumn, ExportRow, Sheet, XlsxFile};
use crate::filters::{FilterPanel, LoanField, LoanFilters, LoanType, Period, SelectOption};
use crate::format;
use crate::models::loan::{ClientSummary, KaryawanOverdue, KaryawanResponse, LoanPurpose};
use crate::table::{self, CellValue, Column, Sort, SortOrder, TableQuery, TableRow, TableState, TableView};
use crate::widget::{session_id, Tile, Widget, SELECT_PERIOD};
use crate::AppState;

use super::{bad_request, export_error, guarded, settled, upstream_error, HandlerError};

// Guard keys name the panel, not the loan type: switching loan type on the
// same page must supersede the fetch still in flight.
const COVERAGE_W: &str = "loan.coverage_utilization";
const RISK_W: &str = "loan.repayment_risk";
const PURPOSE_W: &str = "loan.loan_purpose";
const REQUESTS_W: &str = "loan.requests";
const DISBURSEMENT_W: &str = "loan.disbursement";
const COVERAGE_MONTHLY_W: &str = "loan.coverage_utilization_monthly";
const RISK_MONTHLY_W: &str = "loan.repayment_risk_monthly";
const DISBURSEMENT_MONTHLY_W: &str = "loan.disbursement_monthly";
const OVERDUE_W: &str = "loan.karyawan_overdue";
const CLIENTS_W: &str = "loan.client_summary";

// ───────────────────────────────────────
// Filters
// ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoanOptions {
    pub employers: Vec<SelectOption>,
    pub placements: Vec<SelectOption>,
    pub projects: Vec<SelectOption>,
}

fn with_all(values: Vec<String>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "All"))
        .chain(values.into_iter().map(|v| SelectOption::new(v.clone(), v)))
        .collect()
}

async fn load_options(
    state: &AppState,
    filters: &LoanFilters,
    loan_type: LoanType,
) -> Result<LoanOptions, HandlerError> {
    let params = LoanFilterParams {
        employer: filters.employer(),
        placement: filters.placement(),
        loan_type: Some(loan_type),
    };
    let resp = state.api.loan_filters(&params).await.map_err(upstream_error)?;
    Ok(LoanOptions {
        employers: with_all(resp.filters.employers),
        placements: with_all(resp.filters.placements),
        projects: with_all(resp.filters.projects),
    })
}

pub async fn filters(
    State(state): State<AppState>,
    Query(filters): Query<LoanFilters>,
) -> Result<Json<LoanOptions>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    Ok(Json(load_options(&state, &filters, loan_type).await?))
}

#[derive(Debug, Deserialize)]
pub struct LoanFilterChange {
    #[serde(default)]
    pub filters: LoanFilters,
    pub field: LoanField,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct LoanFilterChangeResp {
    pub filters: LoanFilters,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<LoanOptions>,
}

pub async fn change_filters(
    State(state): State<AppState>,
    Json(change): Json<LoanFilterChange>,
) -> Result<Json<LoanFilterChangeResp>, HandlerError> {
    let mut next = change.filters.on_change(change.field, change.value);
    // narrower selections belong to the old parent
    match change.field {
        LoanField::Employer => {
            next.placement.clear();
            next.project.clear();
        }
        LoanField::Placement => next.project.clear(),
        _ => {}
    }
    let loan_type = next.loan_type().map_err(bad_request)?;
    next.period().map_err(bad_request)?;

    let options = match change.field {
        LoanField::LoanType | LoanField::Employer | LoanField::Placement => {
            Some(load_options(&state, &next, loan_type).await?)
        }
        _ => None,
    };
    Ok(Json(LoanFilterChangeResp { ready: next.is_ready(), filters: next, options }))
}

// ───────────────────────────────────────
// Dashboard
// ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurposeRow {
    pub purpose_id: i64,
    pub purpose_name: String,
    pub total_count: i64,
    pub total_amount: f64,
    pub total_amount_display: String,
}

impl From<LoanPurpose> for PurposeRow {
    fn from(p: LoanPurpose) -> Self {
        Self {
            purpose_id: p.purpose_id,
            purpose_name: p.purpose_name,
            total_count: p.total_count,
            total_amount_display: format::rupiah(p.total_amount),
            total_amount: p.total_amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoanDashboard {
    pub coverage: Widget<Vec<Tile>>,
    pub repayment_risk: Widget<Vec<Tile>>,
    pub loan_purposes: Widget<Vec<PurposeRow>>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
) -> Result<Json<LoanDashboard>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let session = session_id(&headers);
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(LoanDashboard {
            coverage: settled(&state, session, COVERAGE_W, Widget::awaiting_period()),
            repayment_risk: settled(&state, session, RISK_W, Widget::awaiting_period()),
            loan_purposes: settled(&state, session, PURPOSE_W, Widget::awaiting_period()),
        }));
    };
    let params = LoanPeriodParams::new(&filters, Some(period), Some(loan_type));
    let api = &state.api;

    let (coverage, repayment_risk, loan_purposes) = tokio::join!(
        guarded(&state, session, COVERAGE_W, async {
            Widget::from_result(COVERAGE_W, api.coverage_utilization(&params).await, |r| {
                Widget::loaded(
                    vec![
                        Tile::count("Total Eligible Employees", r.total_eligible_employees),
                        Tile::count("Total Active Employees", r.total_active_employees),
                        Tile::rate("Eligible Rate", r.eligible_rate),
                        Tile::count("Total Loan Requests", r.total_loan_requests),
                        Tile::rate("Penetration Rate", r.penetration_rate),
                        Tile::count("Total Approved Requests", r.total_approved_requests),
                        Tile::count("Total Rejected Requests", r.total_rejected_requests),
                        Tile::rate("Approval Rate", r.approval_rate),
                        Tile::count("Total New Borrowers", r.total_new_borrowers),
                        Tile::days("Average Approval Time", r.average_approval_time),
                        Tile::currency("Total Disbursed Amount", r.total_disbursed_amount),
                        Tile::currency("Average Disbursed Amount", r.average_disbursed_amount),
                    ],
                    r.message,
                )
            })
        }),
        guarded(&state, session, RISK_W, async {
            Widget::from_result(RISK_W, api.repayment_risk(&params).await, |r| {
                Widget::loaded(
                    vec![
                        Tile::currency("Total Expected Repayment", r.total_expected_repayment),
                        Tile::currency("Total Loan Principal Collected", r.total_loan_principal_collected),
                        Tile::currency("Total Admin Fee Collected", r.total_admin_fee_collected),
                        Tile::currency("Total Unrecovered Repayment", r.total_unrecovered_repayment),
                        Tile::currency("Total Unrecovered Loan Principal", r.total_unrecovered_loan_principal),
                        Tile::currency("Total Unrecovered Admin Fee", r.total_unrecovered_admin_fee),
                        Tile::rate("Repayment Recovery Rate", r.repayment_recovery_rate),
                        Tile::rate("Delinquencies Rate", r.delinquencies_rate),
                        Tile::currency("Admin Fee Profit", r.admin_fee_profit),
                    ],
                    r.message,
                )
            })
        }),
        guarded(&state, session, PURPOSE_W, async {
            Widget::from_result(PURPOSE_W, api.loan_purpose(&params).await, |r| {
                Widget::loaded(r.results.into_iter().map(PurposeRow::from).collect(), r.message)
            })
        }),
    );

    Ok(Json(LoanDashboard { coverage, repayment_risk, loan_purposes }))
}

#[derive(Debug, Serialize)]
pub struct LoanActivity {
    pub requests: Widget<Vec<Tile>>,
    pub disbursement: Widget<Vec<Tile>>,
}

/// Request and disbursement totals; these endpoints ignore the loan type.
pub async fn activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
) -> Result<Json<LoanActivity>, HandlerError> {
    filters.loan_type().map_err(bad_request)?;
    let session = session_id(&headers);
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(LoanActivity {
            requests: settled(&state, session, REQUESTS_W, Widget::awaiting_period()),
            disbursement: settled(&state, session, DISBURSEMENT_W, Widget::awaiting_period()),
        }));
    };
    let params = LoanPeriodParams::new(&filters, Some(period), None);
    let api = &state.api;

    let (requests, disbursement) = tokio::join!(
        guarded(&state, session, REQUESTS_W, async {
            Widget::from_result(REQUESTS_W, api.loan_requests(&params).await, |r| {
                Widget::loaded(
                    vec![
                        Tile::count("Total Approved Requests", r.total_approved_requests),
                        Tile::count("Total Rejected Requests", r.total_rejected_requests),
                        Tile::rate("Approval Rate", r.approval_rate),
                        Tile::days("Average Approval Time", r.average_approval_time),
                    ],
                    r.message,
                )
            })
        }),
        guarded(&state, session, DISBURSEMENT_W, async {
            Widget::from_result(DISBURSEMENT_W, api.loan_disbursement(&params).await, |r| {
                Widget::loaded(
                    vec![
                        Tile::currency("Total Disbursed Amount", r.total_disbursed_amount),
                        Tile::currency("Average Disbursed Amount", r.average_disbursed_amount),
                    ],
                    r.message,
                )
            })
        }),
    );

    Ok(Json(LoanActivity { requests, disbursement }))
}

// ───────────────────────────────────────
// Monthly charts
// ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChartQuery<V> {
    /// `YYYY-MM-DD`; empty means the default window around the period.
    pub start_date: String,
    pub end_date: String,
    pub view: V,
}

fn range_params<V>(
    filters: &LoanFilters,
    q: &ChartQuery<V>,
    loan_type: Option<LoanType>,
) -> Result<LoanRangeParams, HandlerError> {
    let period = filters.period().map_err(bad_request)?;
    let today = Local::now().date_naive();
    let (start_date, end_date) =
        chart::loan_range(period, today, &q.start_date, &q.end_date).map_err(bad_request)?;
    Ok(LoanRangeParams { scope: LoanScope::from_filters(filters), start_date, end_date, loan_type })
}

fn range_of(params: &LoanRangeParams) -> ChartRange {
    ChartRange {
        start: params.start_date.format("%Y-%m-%d").to_string(),
        end: params.end_date.format("%Y-%m-%d").to_string(),
    }
}

pub async fn coverage_monthly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
    Query(q): Query<ChartQuery<CoverageChartView>>,
) -> Result<Json<Widget<MonthlyChart>>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let params = range_params(&filters, &q, Some(loan_type))?;

    let widget = guarded(&state, session_id(&headers), COVERAGE_MONTHLY_W, async {
        Widget::from_result(COVERAGE_MONTHLY_W, state.api.coverage_utilization_monthly(&params).await, |r| {
            let chart = chart::build_chart(&r.monthly_data, q.view.metrics());
            Widget::loaded(MonthlyChart { range: range_of(&params), chart }, r.message)
        })
    })
    .await;
    Ok(Json(widget))
}

pub async fn repayment_risk_monthly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
    Query(q): Query<ChartQuery<RepaymentRiskChartView>>,
) -> Result<Json<Widget<MonthlyChart>>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let params = range_params(&filters, &q, Some(loan_type))?;

    let widget = guarded(&state, session_id(&headers), RISK_MONTHLY_W, async {
        Widget::from_result(RISK_MONTHLY_W, state.api.repayment_risk_monthly(&params).await, |r| {
            let chart = chart::build_chart(&r.monthly_data, q.view.metrics());
            Widget::loaded(MonthlyChart { range: range_of(&params), chart }, r.message)
        })
    })
    .await;
    Ok(Json(widget))
}

pub async fn disbursement_monthly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
    Query(q): Query<ChartQuery<DisbursementChartView>>,
) -> Result<Json<Widget<MonthlyChart>>, HandlerError> {
    filters.loan_type().map_err(bad_request)?;
    let params = range_params(&filters, &q, None)?;

    let widget = guarded(&state, session_id(&headers), DISBURSEMENT_MONTHLY_W, async {
        Widget::from_result(DISBURSEMENT_MONTHLY_W, state.api.loan_disbursement_monthly(&params).await, |r| {
            let chart = chart::build_chart(&r.monthly_data, q.view.metrics());
            Widget::loaded(MonthlyChart { range: range_of(&params), chart }, r.message)
        })
    })
    .await;
    Ok(Json(widget))
}

// ───────────────────────────────────────
// Overdue employees
// ───────────────────────────────────────

const OVERDUE_SORT: Sort = Sort { column: "days_overdue", order: SortOrder::Desc };

const OVERDUE_COLUMNS: &[Column] = &[
    Column::number("id_karyawan", "ID"),
    Column::text("name", "Name"),
    Column::text("ktp", "KTP"),
    Column::text("company", "Company"),
    Column::text("sourced_to", "Sourced To"),
    Column::text("project", "Project"),
    Column::number("total_amount_owed", "Total Amount Owed"),
    Column::number("admin_fee", "Admin Fee"),
    Column::number("total_payment", "Total Payment"),
    Column::text("repayment_date", "Repayment Date"),
    Column::number("days_overdue", "Days Overdue"),
];

impl TableRow for KaryawanOverdue {
    fn columns() -> &'static [Column] {
        OVERDUE_COLUMNS
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id_karyawan" => self.id_karyawan.into(),
            "name" => self.name.as_str().into(),
            "ktp" => self.ktp.as_str().into(),
            "company" => self.company.as_str().into(),
            "sourced_to" => self.sourced_to.as_str().into(),
            "project" => self.project.as_str().into(),
            "total_amount_owed" => self.total_amount_owed.into(),
            "admin_fee" => self.admin_fee.into(),
            "total_payment" => self.total_payment.into(),
            "repayment_date" => self.repayment_date.as_str().into(),
            "days_overdue" => self.days_overdue.into(),
            _ => CellValue::Text(String::new()),
        }
    }

    fn display(&self, key: &str) -> String {
        match key {
            "total_amount_owed" => format::idr(self.total_amount_owed),
            "admin_fee" => format::idr(self.admin_fee),
            "total_payment" => format::idr(self.total_payment),
            _ => table::plain(self.value(key)),
        }
    }
}

impl ExportRow for KaryawanOverdue {
    fn export_columns() -> Vec<ExportColumn> {
        vec![
            ExportColumn::new("ID", 10.0),
            ExportColumn::new("Name", 30.0),
            ExportColumn::new("KTP", 20.0),
            ExportColumn::new("Company", 25.0),
            ExportColumn::new("Sourced To", 25.0),
            ExportColumn::new("Project", 25.0),
            ExportColumn::new("Total Amount Owed", 18.0),
            ExportColumn::new("Admin Fee", 15.0),
            ExportColumn::new("Total Payment", 18.0),
            ExportColumn::new("Repayment Date", 15.0),
            ExportColumn::new("Days Overdue", 12.0),
        ]
    }

    fn export_cells(&self) -> Vec<ExportCell> {
        vec![
            self.id_karyawan.into(),
            self.name.as_str().into(),
            self.ktp.as_str().into(),
            self.company.as_str().into(),
            self.sourced_to.as_str().into(),
            self.project.as_str().into(),
            self.total_amount_owed.into(),
            self.admin_fee.into(),
            self.total_payment.into(),
            self.repayment_date.as_str().into(),
            self.days_overdue.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueTotals {
    pub count: usize,
    pub total_amount_owed: f64,
    pub total_amount_owed_display: String,
}

fn overdue_totals(rows: &[&KaryawanOverdue]) -> OverdueTotals {
    let total_amount_owed = rows.iter().map(|r| r.total_amount_owed).sum();
    OverdueTotals {
        count: rows.len(),
        total_amount_owed,
        total_amount_owed_display: format::idr(total_amount_owed),
    }
}

/// Narrows the overdue list to one employee.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeQuery {
    pub id_karyawan: String,
}

fn overdue_params(
    filters: &LoanFilters,
    employee: &EmployeeQuery,
    period: Period,
    loan_type: LoanType,
) -> Result<LoanPeriodParams, HandlerError> {
    let raw = employee.id_karyawan.trim();
    let id_karyawan = if raw.is_empty() {
        None
    } else {
        Some(raw.parse().map_err(|_| bad_request(format!("invalid id_karyawan: {raw:?}")))?)
    };
    Ok(LoanPeriodParams { id_karyawan, ..LoanPeriodParams::new(filters, Some(period), Some(loan_type)) })
}

fn required_period(filters: &LoanFilters) -> Result<Period, HandlerError> {
    filters.period().map_err(bad_request)?.ok_or_else(|| bad_request(SELECT_PERIOD))
}

pub async fn overdue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
    Query(employee): Query<EmployeeQuery>,
    Query(tq): Query<TableQuery>,
) -> Result<Json<Widget<TableView<OverdueTotals>>>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let table_state =
        TableState::resolve::<KaryawanOverdue>(&tq, OVERDUE_SORT, state.rows_per_page).map_err(bad_request)?;
    let session = session_id(&headers);
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(settled(&state, session, OVERDUE_W, Widget::awaiting_period())));
    };
    let params = overdue_params(&filters, &employee, period, loan_type)?;

    let widget = guarded(&state, session, OVERDUE_W, async {
        Widget::from_result(OVERDUE_W, state.api.karyawan_overdue(&params).await, |r| {
            let prepared = table::prepare(&r.results, &table_state);
            Widget::loaded(table::view(&prepared, &table_state, overdue_totals(&prepared)), r.message)
        })
    })
    .await;
    Ok(Json(widget))
}

pub async fn export_overdue(
    State(state): State<AppState>,
    Query(filters): Query<LoanFilters>,
    Query(employee): Query<EmployeeQuery>,
    Query(tq): Query<TableQuery>,
) -> Result<XlsxFile, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let table_state =
        TableState::resolve::<KaryawanOverdue>(&tq, OVERDUE_SORT, state.rows_per_page).map_err(bad_request)?;
    let period = required_period(&filters)?;
    let params = overdue_params(&filters, &employee, period, loan_type)?;
    let resp = state.api.karyawan_overdue(&params).await.map_err(upstream_error)?;

    let prepared = table::prepare(&resp.results, &table_state);
    let title = format!("{} Non Performing List", loan_type.label());
    let bytes = export::sheet(&title, &prepared).to_xlsx().map_err(export_error)?;
    Ok(XlsxFile { file_name: export::file_name(&title, Some(period)), bytes })
}

// ───────────────────────────────────────
// Client rankings
// ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRanking {
    TotalDisbursement,
    TotalRequests,
    PenetrationRate,
    AdminFeeProfit,
    DelinquencyRate,
}

impl ClientRanking {
    pub const ALL: [Self; 5] = [
        Self::TotalDisbursement,
        Self::TotalRequests,
        Self::PenetrationRate,
        Self::AdminFeeProfit,
        Self::DelinquencyRate,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::TotalDisbursement => "Clients by Total Disbursement",
            Self::TotalRequests => "Clients by Total Requests",
            Self::PenetrationRate => "Clients by Penetration Rate",
            Self::AdminFeeProfit => "Clients by Highest Net Admin Fee",
            Self::DelinquencyRate => "Clients by Highest Delinquency",
        }
    }

    pub fn value_label(self) -> &'static str {
        match self {
            Self::TotalDisbursement => "Total Disbursement",
            Self::TotalRequests => "Total Requests",
            Self::PenetrationRate => "Penetration Rate",
            Self::AdminFeeProfit => "Net Admin Fee",
            Self::DelinquencyRate => "Delinquency Rate",
        }
    }

    fn value(self, c: &ClientSummary) -> f64 {
        match self {
            Self::TotalDisbursement => c.total_disbursement,
            Self::TotalRequests => c.total_requests as f64,
            Self::PenetrationRate => c.penetration_rate,
            Self::AdminFeeProfit => c.admin_fee_profit,
            Self::DelinquencyRate => c.delinquency_rate,
        }
    }

    fn display(self, value: f64) -> String {
        match self {
            Self::TotalDisbursement | Self::AdminFeeProfit => format::idr(value),
            Self::TotalRequests => format::count(value as i64),
            Self::PenetrationRate | Self::DelinquencyRate => format::percent(value),
        }
    }

    /// Highest first; ties keep upstream order.
    pub fn rank(self, clients: &[ClientSummary]) -> Vec<RankedClient> {
        let mut sorted: Vec<&ClientSummary> = clients.iter().collect();
        sorted.sort_by(|a, b| self.value(b).total_cmp(&self.value(a)));
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let value = self.value(c);
                RankedClient {
                    rank: i + 1,
                    sourced_to: c.sourced_to.clone(),
                    project: c.project.clone(),
                    value,
                    display: self.display(value),
                }
            })
            .collect()
    }

    fn sheet(self, rows: &[RankedClient]) -> Sheet {
        let mut sheet = Sheet::new(
            &self.title().replace(' ', ""),
            vec![
                ExportColumn::new("Rank", 8.0),
                ExportColumn::new("Sourced To", 35.0),
                ExportColumn::new("Project", 25.0),
                ExportColumn::new(self.value_label(), 20.0),
            ],
        );
        for row in rows {
            sheet.push(vec![
                (row.rank as i64).into(),
                row.sourced_to.as_str().into(),
                row.project.as_str().into(),
                row.display.as_str().into(),
            ]);
        }
        sheet
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClient {
    pub rank: usize,
    pub sourced_to: String,
    pub project: String,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub key: ClientRanking,
    pub title: &'static str,
    pub value_label: &'static str,
    pub rows: Vec<RankedClient>,
}

pub async fn clients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<LoanFilters>,
) -> Result<Json<Widget<Vec<Ranking>>>, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let session = session_id(&headers);
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(settled(&state, session, CLIENTS_W, Widget::awaiting_period())));
    };
    let params = ClientSummaryParams { period, loan_type };

    let widget = guarded(&state, session, CLIENTS_W, async {
        Widget::from_result(CLIENTS_W, state.api.client_summary(&params).await, |r| {
            let rankings: Vec<Ranking> = ClientRanking::ALL
                .into_iter()
                .map(|ranking| Ranking {
                    key: ranking,
                    title: ranking.title(),
                    value_label: ranking.value_label(),
                    rows: ranking.rank(&r.results),
                })
                .collect();
            Widget::loaded(rankings, None)
        })
    })
    .await;
    Ok(Json(widget))
}

#[derive(Debug, Deserialize)]
pub struct RankingExportQuery {
    pub ranking: ClientRanking,
}

pub async fn export_clients(
    State(state): State<AppState>,
    Query(filters): Query<LoanFilters>,
    Query(q): Query<RankingExportQuery>,
) -> Result<XlsxFile, HandlerError> {
    let loan_type = filters.loan_type().map_err(bad_request)?;
    let period = required_period(&filters)?;
    let resp = state
        .api
        .client_summary(&ClientSummaryParams { period, loan_type })
        .await
        .map_err(upstream_error)?;

    let rows = q.ranking.rank(&resp.results);
    let bytes = q.ranking.sheet(&rows).to_xlsx().map_err(export_error)?;
    Ok(XlsxFile { file_name: export::file_name(q.ranking.title(), Some(period)), bytes })
}

// ───────────────────────────────────────
// Employees
// ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KaryawanQuery {
    pub klient: String,
}

pub async fn karyawan(
    State(state): State<AppState>,
    Query(q): Query<KaryawanQuery>,
) -> Result<Json<KaryawanResponse>, HandlerError> {
    let params = KaryawanParams { klient: Some(q.klient) };
    let resp = state.api.karyawan(&params).await.map_err(upstream_error)?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{get, get_with_session, post_json, raw_get, test_app, test_state, MockUpstream};
    use axum::{extract::RawQuery, http::StatusCode, Router};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn client(sourced_to: &str, disbursement: f64, requests: i64, delinquency: f64) -> Value {
        json!({
            "sourced_to": sourced_to,
            "project": "Retail",
            "total_disbursement": disbursement,
            "total_requests": requests,
            "approved_requests": requests,
            "eligible_employees": 100,
            "active_employees": 80,
            "eligible_rate": 80.0,
            "penetration_rate": requests as f64,
            "total_admin_fee_collected": 10.0,
            "total_unrecovered_payment": 0.0,
            "admin_fee_profit": 10.0,
            "delinquent_requests": 1,
            "delinquency_rate": delinquency
        })
    }

    fn overdue_row(id: i64, name: &str, owed: f64, days: i64) -> Value {
        json!({
            "id_karyawan": id,
            "ktp": format!("317{id}"),
            "name": name,
            "company": "PT Valdo",
            "sourced_to": "Jakarta",
            "project": "Retail",
            "total_amount_owed": owed,
            "admin_fee": 5000.0,
            "total_payment": 0.0,
            "repayment_date": "2025-08-25",
            "days_overdue": days
        })
    }

    #[tokio::test]
    async fn dashboard_widgets_fail_independently() {
        let upstream = MockUpstream::canned(&[
            (
                "/loan/coverage-utilization",
                json!({
                    "status": "success",
                    "total_eligible_employees": 120,
                    "total_active_employees": 100,
                    "total_loan_requests": 40,
                    "penetration_rate": 33.33,
                    "eligible_rate": 83.3,
                    "total_approved_requests": 30,
                    "total_rejected_requests": 10,
                    "approval_rate": 75.0,
                    "total_new_borrowers": 5,
                    "average_approval_time": 1.5,
                    "total_disbursed_amount": 15000000.0,
                    "average_disbursed_amount": 500000.0
                }),
            ),
            (
                "/loan/loan-purpose",
                json!({
                    "status": "success",
                    "count": 1,
                    "results": [
                        { "purpose_id": 2, "purpose_name": "Education", "total_count": 4, "total_amount": 2000000.0 }
                    ]
                }),
            ),
        ])
        .await;

        let (status, body) = get(
            test_app(&upstream),
            "/api/v1/loan/dashboard?loan_type=extradana&month=08&year=2025&placement=Jakarta",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["coverage"]["state"], "loaded");
        assert_eq!(body["coverage"]["data"][4]["display"], "33.33%");
        assert_eq!(body["coverage"]["data"][9]["display"], "1.5 days");
        assert_eq!(body["repayment_risk"]["state"], "failed");
        assert_eq!(body["loan_purposes"]["data"][0]["total_amount_display"], "Rp 2.000.000");
        assert_eq!(
            upstream.queries("/loan/coverage-utilization"),
            vec!["sourced_to=Jakarta&month=08&year=2025&loan_type=extradana"]
        );
    }

    #[tokio::test]
    async fn unknown_loan_type_is_rejected() {
        let upstream = MockUpstream::canned(&[]).await;
        let (status, _) = get(test_app(&upstream), "/api/v1/loan/dashboard?loan_type=mortgage&month=08&year=2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activity_omits_loan_type_upstream() {
        let upstream = MockUpstream::canned(&[
            (
                "/loan/requests",
                json!({
                    "status": "success",
                    "total_approved_requests": 8,
                    "total_rejected_requests": 2,
                    "approval_rate": 80.0,
                    "average_approval_time": 2.0
                }),
            ),
            (
                "/loan/disbursement",
                json!({ "status": "success", "total_disbursed_amount": 1000.0, "average_disbursed_amount": 125.0 }),
            ),
        ])
        .await;
        let (_, body) = get(test_app(&upstream), "/api/v1/loan/activity?month=08&year=2025").await;
        assert_eq!(body["requests"]["data"][2]["display"], "80.00%");
        assert_eq!(body["disbursement"]["data"][1]["display"], "Rp 125");
        assert_eq!(upstream.queries("/loan/requests"), vec!["month=08&year=2025"]);
    }

    #[tokio::test]
    async fn monthly_chart_spans_whole_months() {
        let upstream = MockUpstream::canned(&[(
            "/loan/coverage-utilization-monthly",
            json!({
                "status": "success",
                "monthly_data": {
                    "July 2025": {
                        "total_first_borrow": 2, "total_loan_requests": 9, "total_approved_requests": 7,
                        "total_rejected_requests": 2, "penetration_rate": 10.0, "total_disbursed_amount": 700.0
                    },
                    "March 2025": {
                        "total_first_borrow": 1, "total_loan_requests": 3, "total_approved_requests": 3,
                        "total_rejected_requests": 0, "penetration_rate": 5.0, "total_disbursed_amount": 300.0
                    }
                }
            }),
        )])
        .await;
        let (_, body) = get(
            test_app(&upstream),
            "/api/v1/loan/coverage-monthly?month=08&year=2025&view=rates",
        )
        .await;
        assert_eq!(body["data"]["range"], json!({ "start": "2025-02-01", "end": "2025-08-31" }));
        assert_eq!(body["data"]["chart"]["categories"], json!(["March 2025", "July 2025"]));
        assert_eq!(body["data"]["chart"]["series"][0]["data"], json!([5.0, 10.0]));
        assert_eq!(
            upstream.queries("/loan/coverage-utilization-monthly"),
            vec!["start_date=2025-02-01&end_date=2025-08-31&loan_type=kasbon"]
        );

        let (status, _) = get(test_app(&upstream), "/api/v1/loan/coverage-monthly?start_date=01-02-2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overdue_table_defaults_to_longest_overdue() {
        let upstream = MockUpstream::canned(&[(
            "/loan/karyawan-overdue",
            json!({
                "status": "success",
                "count": 3,
                "results": [
                    overdue_row(1, "Ani", 100000.0, 9),
                    overdue_row(2, "Budi", 250000.0, 45),
                    overdue_row(3, "Citra", 50000.0, 10)
                ]
            }),
        )])
        .await;
        let (_, body) = get(test_app(&upstream), "/api/v1/loan/overdue?month=08&year=2025").await;
        let names: Vec<&str> = body["data"]["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r[1]["display"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Budi", "Citra", "Ani"]);
        assert_eq!(body["data"]["totals"]["total_amount_owed"], 400000.0);

        let (_, body) = get(test_app(&upstream), "/api/v1/loan/overdue").await;
        assert_eq!(body["state"], "empty");

        let resp = raw_get(test_app(&upstream), "/api/v1/loan/overdue/export?month=08&year=2025&loan_type=aku_cicil").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"aku-cicil-non-performing-list-08-2025.xlsx\""
        );
    }

    #[tokio::test]
    async fn client_rankings_sort_highest_first() {
        let upstream = MockUpstream::canned(&[(
            "/loan/client-summary",
            json!({
                "status": "success",
                "count": 3,
                "results": [
                    client("Bandung", 500.0, 9, 1.5),
                    client("Jakarta", 900.0, 10, 0.5),
                    client("Surabaya", 100.0, 2, 7.25)
                ]
            }),
        )])
        .await;
        let (_, body) = get(test_app(&upstream), "/api/v1/loan/clients?month=08&year=2025").await;
        let rankings = body["data"].as_array().unwrap();
        assert_eq!(rankings.len(), 5);

        let first = |key: &str| -> String {
            let ranking = rankings.iter().find(|r| r["key"] == key).unwrap();
            ranking["rows"][0]["sourced_to"].as_str().unwrap().to_string()
        };
        assert_eq!(first("total_disbursement"), "Jakarta");
        assert_eq!(first("total_requests"), "Jakarta");
        assert_eq!(first("delinquency_rate"), "Surabaya");
        assert_eq!(rankings[0]["rows"][0]["display"], "IDR 900");
        assert_eq!(upstream.queries("/loan/client-summary"), vec!["month=08&year=2025&loan_type=kasbon"]);

        let resp = raw_get(
            test_app(&upstream),
            "/api/v1/loan/clients/export?month=08&year=2025&ranking=delinquency_rate",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"clients-by-highest-delinquency-08-2025.xlsx\""
        );

        let (status, _) = get(test_app(&upstream), "/api/v1/loan/clients/export?month=08&year=2025&ranking=best").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn employer_change_resets_narrower_choices() {
        let upstream = MockUpstream::canned(&[(
            "/loan/filters",
            json!({
                "status": "success",
                "filters": { "employers": ["PT A", "PT B"], "placements": ["Jakarta"], "projects": ["Retail"] }
            }),
        )])
        .await;
        let (status, body) = post_json(
            test_app(&upstream),
            "/api/v1/loan/filters/change",
            json!({
                "filters": { "loan_type": "kasbon", "month": "08", "year": "2025", "placement": "Bandung", "project": "Old" },
                "field": "employer",
                "value": "PT B"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filters"]["employer"], "PT B");
        assert_eq!(body["filters"]["placement"], "");
        assert_eq!(body["filters"]["project"], "");
        assert_eq!(body["options"]["placements"][1]["value"], "Jakarta");
        assert_eq!(upstream.queries("/loan/filters"), vec!["employer=PT+B&loan_type=kasbon"]);

        let (_, body) = post_json(
            test_app(&upstream),
            "/api/v1/loan/filters/change",
            json!({ "filters": { "month": "08" }, "field": "year", "value": "2025" }),
        )
        .await;
        assert_eq!(body["ready"], true);
        assert!(body.get("options").is_none());
    }

    #[tokio::test]
    async fn karyawan_passes_client_through() {
        let upstream = MockUpstream::canned(&[(
            "/karyawan",
            json!({
                "status": "success",
                "count": 1,
                "results": [{ "id_karyawan": 7, "status": "active", "loan_kasbon_eligible": 1, "klient": "12" }]
            }),
        )])
        .await;
        let (_, body) = get(test_app(&upstream), "/api/v1/karyawan?klient=12").await;
        assert_eq!(body["results"][0]["id_karyawan"], 7);
        assert_eq!(upstream.queries("/karyawan"), vec!["klient=12"]);

        get(test_app(&upstream), "/api/v1/karyawan").await;
        assert_eq!(upstream.queries("/karyawan")[1], "");
    }

    #[tokio::test]
    async fn switching_loan_type_supersedes_the_pending_fetch() {
        let coverage = json!({
            "status": "success",
            "total_eligible_employees": 10, "total_active_employees": 9, "total_loan_requests": 4,
            "penetration_rate": 40.0, "eligible_rate": 90.0, "total_approved_requests": 3,
            "total_rejected_requests": 1, "approval_rate": 75.0, "total_new_borrowers": 1,
            "average_approval_time": 1.0, "total_disbursed_amount": 300.0, "average_disbursed_amount": 100.0
        });
        let upstream = MockUpstream::spawn(Router::new().route(
            "/loan/coverage-utilization",
            axum::routing::get(move |RawQuery(q): RawQuery| {
                let coverage = coverage.clone();
                async move {
                    if q.unwrap_or_default().contains("loan_type=kasbon") {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                    }
                    Json(coverage)
                }
            }),
        ))
        .await;
        let state = test_state(&upstream);
        let session = Uuid::new_v4();

        let slow = tokio::spawn(get_with_session(
            crate::app(state.clone()),
            "/api/v1/loan/dashboard?loan_type=kasbon&month=08&year=2025",
            session,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, fresh) = get_with_session(
            crate::app(state.clone()),
            "/api/v1/loan/dashboard?loan_type=extradana&month=08&year=2025",
            session,
        )
        .await;
        let (_, stale) = slow.await.unwrap();

        assert_eq!(fresh["coverage"]["state"], "loaded");
        assert_eq!(stale["coverage"]["state"], "superseded");
        assert_eq!(state.guard.pending(), 0);
    }

    #[tokio::test]
    async fn overdue_can_be_narrowed_to_one_employee() {
        let upstream = MockUpstream::canned(&[(
            "/loan/karyawan-overdue",
            json!({ "status": "success", "count": 1, "results": [overdue_row(2, "Budi", 250000.0, 45)] }),
        )])
        .await;
        let (status, body) = get(test_app(&upstream), "/api/v1/loan/overdue?month=08&year=2025&id_karyawan=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_rows"], 1);
        assert_eq!(
            upstream.queries("/loan/karyawan-overdue"),
            vec!["id_karyawan=2&month=08&year=2025&loan_type=kasbon"]
        );

        let (status, _) = get(test_app(&upstream), "/api/v1/loan/overdue?month=08&year=2025&id_karyawan=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
