// src/routes/payroll.rs
//
// Internal and external payroll pages. `:scope` picks the upstream family.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::chart::{self, ChartRange, MonthlyChart, PayrollChartView};
use crate::client::payroll::{
    DepartmentFilterParams, PayrollBreakdownParams, PayrollMonthlyParams, PayrollTotalParams,
};
use crate::export::{self, ExportCell, ExportColumn, ExportRow, XlsxFile};
use crate::filters::{
    FilterPanel, MonthYearFilters, PayrollField, PayrollFilters, PayrollScope, Period, SelectOption,
};
use crate::format;
use crate::models::payroll::{CostOwnerSummary, Department, DepartmentSummary};
use crate::table::{self, CellValue, Column, Sort, SortOrder, TableQuery, TableRow, TableState, TableView};
use crate::widget::{session_id, Tile, Widget, SELECT_PERIOD};
use crate::AppState;

use super::{bad_request, export_error, guarded, settled, upstream_error, HandlerError};

// ───────────────────────────────────────
// Filters
// ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DepartmentOptions {
    pub departments: Vec<SelectOption>,
}

fn department_options(departments: &[Department]) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "All Departments"))
        .chain(departments.iter().map(|d| {
            SelectOption::new(
                d.dept_id.to_string(),
                format::department_option_label(d.dept_id, d.department_name.as_deref()),
            )
        }))
        .collect()
}

async fn load_departments(
    state: &AppState,
    scope: PayrollScope,
    period: Option<Period>,
) -> Result<Vec<SelectOption>, HandlerError> {
    let resp = state
        .api
        .payroll_filters(scope, &DepartmentFilterParams { period })
        .await
        .map_err(upstream_error)?;
    Ok(department_options(&resp.departments))
}

pub async fn filters(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    Query(filters): Query<PayrollFilters>,
) -> Result<Json<DepartmentOptions>, HandlerError> {
    let period = filters.period().map_err(bad_request)?;
    let departments = load_departments(&state, scope, period).await?;
    Ok(Json(DepartmentOptions { departments }))
}

#[derive(Debug, Deserialize)]
pub struct FilterChange {
    #[serde(default)]
    pub filters: PayrollFilters,
    pub field: PayrollField,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct FilterChangeResp {
    pub filters: PayrollFilters,
    pub ready: bool,
    /// Refreshed when month or year moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<SelectOption>>,
}

pub async fn change_filters(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    Json(change): Json<FilterChange>,
) -> Result<Json<FilterChangeResp>, HandlerError> {
    let mut next = change.filters.on_change(change.field, change.value);
    let period = next.period().map_err(bad_request)?;

    let departments = match (change.field, period) {
        (PayrollField::Month | PayrollField::Year, Some(period)) => {
            let options = load_departments(&state, scope, Some(period)).await?;
            // a department missing from the new period's list falls back to all
            if !options.iter().any(|o| o.value == next.department) {
                next.department.clear();
            }
            Some(options)
        }
        _ => None,
    };

    Ok(Json(FilterChangeResp { ready: next.is_ready(), filters: next, departments }))
}

// ───────────────────────────────────────
// Summary tiles
// ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PayrollSummary {
    pub disbursed: Widget<Tile>,
    pub headcount: Widget<Vec<Tile>>,
    pub department_count: Widget<Tile>,
    /// BPJSTK, Kesehatan, Pensiun: loaded together or not at all.
    pub contributions: Widget<Vec<Tile>>,
}

pub async fn summary(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    headers: HeaderMap,
    Query(filters): Query<PayrollFilters>,
) -> Result<Json<PayrollSummary>, HandlerError> {
    let session = session_id(&headers);
    let disbursed_w = scope.widget("total_payroll_disbursed");
    let headcount_w = scope.widget("total_payroll_headcount");
    let count_w = scope.widget("total_department_count");
    let contributions_w = scope.widget("contributions");

    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(PayrollSummary {
            disbursed: settled(&state, session, &disbursed_w, Widget::awaiting_period()),
            headcount: settled(&state, session, &headcount_w, Widget::awaiting_period()),
            department_count: settled(&state, session, &count_w, Widget::awaiting_period()),
            contributions: settled(&state, session, &contributions_w, Widget::awaiting_period()),
        }));
    };
    let params = PayrollTotalParams::from_filters(period, &filters).map_err(bad_request)?;
    let breakdown = PayrollBreakdownParams {
        period,
        status_kontrak: params.status_kontrak,
        valdo_inc: params.valdo_inc,
    };
    let api = &state.api;

    let (disbursed, headcount, department_count, contributions) = tokio::join!(
        guarded(&state, session, &disbursed_w, async {
            Widget::from_result(&disbursed_w, api.total_payroll_disbursed(scope, &params).await, |r| {
                Widget::loaded(Tile::currency("Total Payroll Disbursed", r.total_payroll_disbursed), r.message)
            })
        }),
        guarded(&state, session, &headcount_w, async {
            Widget::from_result(&headcount_w, api.total_payroll_headcount(scope, &params).await, |r| {
                Widget::loaded(
                    vec![
                        Tile::count("Total Headcount", r.total_headcount),
                        Tile::count("PKWTT Headcount", r.pkwtt_headcount),
                        Tile::count("PKWT Headcount", r.pkwt_headcount),
                        Tile::count("Mitra Headcount", r.mitra_headcount),
                    ],
                    r.message,
                )
            })
        }),
        async {
            // the count endpoint cannot be narrowed to one department
            if params.dept_id.is_some() {
                let na = Widget::loaded(Tile::not_available("Total Department Count"), None);
                return settled(&state, session, &count_w, na);
            }
            guarded(&state, session, &count_w, async {
                Widget::from_result(&count_w, api.total_department_count(scope, &breakdown).await, |r| {
                    Widget::loaded(Tile::count("Total Department Count", r.total_department_count), r.message)
                })
            })
            .await
        },
        guarded(&state, session, &contributions_w, async {
            let totals = tokio::try_join!(
                api.total_bpjstk(scope, &params),
                api.total_kesehatan(scope, &params),
                api.total_pensiun(scope, &params),
            );
            Widget::from_result(&contributions_w, totals, |(bpjstk, kesehatan, pensiun)| {
                Widget::loaded(
                    vec![
                        Tile::currency("Total BPJSTK Company", bpjstk.total_bpjstk),
                        Tile::currency("Total BPJS Kesehatan Company", kesehatan.total_kesehatan),
                        Tile::currency("Total BPJS Pensiun Company", pensiun.total_pensiun),
                    ],
                    bpjstk.message.or(kesehatan.message).or(pensiun.message),
                )
            })
        }),
    );

    Ok(Json(PayrollSummary { disbursed, headcount, department_count, contributions }))
}

// ───────────────────────────────────────
// Monthly chart
// ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonthlyQuery {
    /// `MM-YYYY`; empty means six months before the selected period.
    pub start_month: String,
    pub end_month: String,
    pub view: PayrollChartView,
}

pub async fn monthly(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    headers: HeaderMap,
    Query(filters): Query<PayrollFilters>,
    Query(q): Query<MonthlyQuery>,
) -> Result<Json<Widget<MonthlyChart>>, HandlerError> {
    let session = session_id(&headers);
    let name = scope.widget("monthly");
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(settled(&state, session, &name, Widget::awaiting_period())));
    };
    let (start, end) = chart::payroll_range(period, &q.start_month, &q.end_month).map_err(bad_request)?;
    let totals = PayrollTotalParams::from_filters(period, &filters).map_err(bad_request)?;
    let params = PayrollMonthlyParams {
        start,
        end,
        dept_id: totals.dept_id,
        status_kontrak: totals.status_kontrak,
        valdo_inc: totals.valdo_inc,
    };

    let widget = guarded(&state, session, &name, async {
        Widget::from_result(&name, state.api.payroll_monthly(scope, &params).await, |r| {
            let range = ChartRange { start: start.month_year(), end: end.month_year() };
            let chart = chart::build_chart(&r.summaries, q.view.metrics());
            Widget::loaded(MonthlyChart { range, chart }, r.message)
        })
    })
    .await;
    Ok(Json(widget))
}

// ───────────────────────────────────────
// Department / cost-owner tables
// ───────────────────────────────────────

const DEFAULT_SORT: Sort = Sort { column: "total_disbursed", order: SortOrder::Desc };

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollTotals {
    pub total_disbursed: f64,
    pub total_disbursed_display: String,
    pub total_headcount: i64,
    pub count: usize,
}

trait BreakdownRow: TableRow + ExportRow {
    fn disbursed(&self) -> f64;
    fn headcount(&self) -> i64;
}

fn totals<R: BreakdownRow>(rows: &[&R]) -> PayrollTotals {
    let total_disbursed = rows.iter().map(|r| r.disbursed()).sum();
    PayrollTotals {
        total_disbursed,
        total_disbursed_display: format::idr(total_disbursed),
        total_headcount: rows.iter().map(|r| r.headcount()).sum(),
        count: rows.len(),
    }
}

fn breakdown_view<R: BreakdownRow>(
    rows: &[R],
    message: Option<String>,
    state: &TableState,
) -> Widget<TableView<PayrollTotals>> {
    let prepared = table::prepare(rows, state);
    Widget::loaded(table::view(&prepared, state, totals(&prepared)), message)
}

fn breakdown_export<R: BreakdownRow>(
    rows: &[R],
    state: &TableState,
    title: &str,
    period: Period,
) -> Result<XlsxFile, HandlerError> {
    let prepared = table::prepare(rows, state);
    let bytes = export::sheet(title, &prepared).to_xlsx().map_err(export_error)?;
    Ok(XlsxFile { file_name: export::file_name(title, Some(period)), bytes })
}

fn export_period(filters: &MonthYearFilters) -> Result<Period, HandlerError> {
    filters.period().map_err(bad_request)?.ok_or_else(|| bad_request(SELECT_PERIOD))
}

const DEPARTMENT_COLUMNS: &[Column] = &[
    Column::number("dept_id", "Dept ID"),
    Column::text("department", "Department"),
    Column::text("cost_owner", "Cost Owner"),
    Column::number("total_headcount", "Total Headcount"),
    Column::number("pkwtt_headcount", "PKWTT"),
    Column::number("pkwt_headcount", "PKWT"),
    Column::number("mitra_headcount", "Mitra"),
    Column::number("distribution_ratio", "Distribution Ratio"),
    Column::number("total_disbursed", "Total Disbursed"),
];

impl TableRow for DepartmentSummary {
    fn columns() -> &'static [Column] {
        DEPARTMENT_COLUMNS
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "dept_id" => i64::from(self.dept_id).into(),
            "department" => format::department_name(self.dept_id, self.department_name.as_deref()).into(),
            "cost_owner" => self.cost_owner.as_str().into(),
            "total_headcount" => self.total_headcount.into(),
            "pkwtt_headcount" => self.pkwtt_headcount.into(),
            "pkwt_headcount" => self.pkwt_headcount.into(),
            "mitra_headcount" => self.mitra_headcount.into(),
            "distribution_ratio" => self.distribution_ratio.into(),
            "total_disbursed" => self.total_disbursed.into(),
            _ => CellValue::Text(String::new()),
        }
    }

    fn display(&self, key: &str) -> String {
        match key {
            "distribution_ratio" => format::ratio(self.distribution_ratio),
            "total_disbursed" => format::idr(self.total_disbursed),
            _ => table::plain(self.value(key)),
        }
    }
}

impl ExportRow for DepartmentSummary {
    fn export_columns() -> Vec<ExportColumn> {
        vec![
            ExportColumn::new("Dept ID", 10.0),
            ExportColumn::new("Department", 35.0),
            ExportColumn::new("Cost Owner", 25.0),
            ExportColumn::new("Total Headcount", 15.0),
            ExportColumn::new("PKWTT Headcount", 12.0),
            ExportColumn::new("PKWT Headcount", 12.0),
            ExportColumn::new("Mitra Headcount", 12.0),
            ExportColumn::new("Distribution Ratio", 18.0),
            ExportColumn::new("Total Disbursed", 18.0),
        ]
    }

    fn export_cells(&self) -> Vec<ExportCell> {
        vec![
            self.dept_id.into(),
            format::department_name(self.dept_id, self.department_name.as_deref()).into(),
            self.cost_owner.as_str().into(),
            self.total_headcount.into(),
            self.pkwtt_headcount.into(),
            self.pkwt_headcount.into(),
            self.mitra_headcount.into(),
            format::ratio(self.distribution_ratio).into(),
            self.total_disbursed.into(),
        ]
    }
}

impl BreakdownRow for DepartmentSummary {
    fn disbursed(&self) -> f64 {
        self.total_disbursed
    }

    fn headcount(&self) -> i64 {
        self.total_headcount
    }
}

const COST_OWNER_COLUMNS: &[Column] = &[
    Column::text("cost_owner", "Cost Owner"),
    Column::number("total_headcount", "Total Headcount"),
    Column::number("pkwtt_headcount", "PKWTT"),
    Column::number("pkwt_headcount", "PKWT"),
    Column::number("mitra_headcount", "Mitra"),
    Column::number("distribution_ratio", "Distribution Ratio"),
    Column::number("total_disbursed", "Total Disbursed"),
];

impl TableRow for CostOwnerSummary {
    fn columns() -> &'static [Column] {
        COST_OWNER_COLUMNS
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "cost_owner" => self.cost_owner.as_str().into(),
            "total_headcount" => self.total_headcount.into(),
            "pkwtt_headcount" => self.pkwtt_headcount.into(),
            "pkwt_headcount" => self.pkwt_headcount.into(),
            "mitra_headcount" => self.mitra_headcount.into(),
            "distribution_ratio" => self.distribution_ratio.into(),
            "total_disbursed" => self.total_disbursed.into(),
            _ => CellValue::Text(String::new()),
        }
    }

    fn display(&self, key: &str) -> String {
        match key {
            "distribution_ratio" => format::ratio(self.distribution_ratio),
            "total_disbursed" => format::idr(self.total_disbursed),
            _ => table::plain(self.value(key)),
        }
    }
}

impl ExportRow for CostOwnerSummary {
    fn export_columns() -> Vec<ExportColumn> {
        vec![
            ExportColumn::new("Cost Owner", 30.0),
            ExportColumn::new("Total Headcount", 15.0),
            ExportColumn::new("PKWTT Headcount", 12.0),
            ExportColumn::new("PKWT Headcount", 12.0),
            ExportColumn::new("Mitra Headcount", 12.0),
            ExportColumn::new("Distribution Ratio", 18.0),
            ExportColumn::new("Total Disbursed", 18.0),
        ]
    }

    fn export_cells(&self) -> Vec<ExportCell> {
        vec![
            self.cost_owner.as_str().into(),
            self.total_headcount.into(),
            self.pkwtt_headcount.into(),
            self.pkwt_headcount.into(),
            self.mitra_headcount.into(),
            format::ratio(self.distribution_ratio).into(),
            self.total_disbursed.into(),
        ]
    }
}

impl BreakdownRow for CostOwnerSummary {
    fn disbursed(&self) -> f64 {
        self.total_disbursed
    }

    fn headcount(&self) -> i64 {
        self.total_headcount
    }
}

pub async fn departments(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    headers: HeaderMap,
    Query(filters): Query<MonthYearFilters>,
    Query(tq): Query<TableQuery>,
) -> Result<Json<Widget<TableView<PayrollTotals>>>, HandlerError> {
    let table_state =
        TableState::resolve::<DepartmentSummary>(&tq, DEFAULT_SORT, state.rows_per_page).map_err(bad_request)?;
    let session = session_id(&headers);
    let name = scope.widget("department_summary");
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(settled(&state, session, &name, Widget::awaiting_period())));
    };
    let params = PayrollBreakdownParams::from_filters(period, &filters).map_err(bad_request)?;

    let widget = guarded(&state, session, &name, async {
        Widget::from_result(&name, state.api.department_summary(scope, &params).await, |r| {
            breakdown_view(&r.departments, r.message, &table_state)
        })
    })
    .await;
    Ok(Json(widget))
}

pub async fn export_departments(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    Query(filters): Query<MonthYearFilters>,
    Query(tq): Query<TableQuery>,
) -> Result<XlsxFile, HandlerError> {
    let table_state =
        TableState::resolve::<DepartmentSummary>(&tq, DEFAULT_SORT, state.rows_per_page).map_err(bad_request)?;
    let period = export_period(&filters)?;
    let params = PayrollBreakdownParams::from_filters(period, &filters).map_err(bad_request)?;
    let resp = state.api.department_summary(scope, &params).await.map_err(upstream_error)?;
    breakdown_export(&resp.departments, &table_state, "Department Summary", period)
}

pub async fn cost_owners(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    headers: HeaderMap,
    Query(filters): Query<MonthYearFilters>,
    Query(tq): Query<TableQuery>,
) -> Result<Json<Widget<TableView<PayrollTotals>>>, HandlerError> {
    let table_state =
        TableState::resolve::<CostOwnerSummary>(&tq, DEFAULT_SORT, state.rows_per_page).map_err(bad_request)?;
    let session = session_id(&headers);
    let name = scope.widget("cost_owner_summary");
    let Some(period) = filters.period().map_err(bad_request)? else {
        return Ok(Json(settled(&state, session, &name, Widget::awaiting_period())));
    };
    let params = PayrollBreakdownParams::from_filters(period, &filters).map_err(bad_request)?;

    let widget = guarded(&state, session, &name, async {
        Widget::from_result(&name, state.api.cost_owner_summary(scope, &params).await, |r| {
            breakdown_view(&r.cost_owners, r.message, &table_state)
        })
    })
    .await;
    Ok(Json(widget))
}

pub async fn export_cost_owners(
    State(state): State<AppState>,
    Path(scope): Path<PayrollScope>,
    Query(filters): Query<MonthYearFilters>,
    Query(tq): Query<TableQuery>,
) -> Result<XlsxFile, HandlerError> {
    let table_state =
        TableState::resolve::<CostOwnerSummary>(&tq, DEFAULT_SORT, state.rows_per_page).map_err(bad_request)?;
    let period = export_period(&filters)?;
    let params = PayrollBreakdownParams::from_filters(period, &filters).map_err(bad_request)?;
    let resp = state.api.cost_owner_summary(scope, &params).await.map_err(upstream_error)?;
    breakdown_export(&resp.cost_owners, &table_state, "Cost Owner Summary", period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{get, get_with_session, post_json, raw_get, test_app, test_state, MockUpstream};
    use axum::{extract::RawQuery, http::StatusCode, Router};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn department(dept_id: u32, name: Option<&str>, cost_owner: &str, disbursed: f64, headcount: i64) -> Value {
        json!({
            "dept_id": dept_id,
            "department_name": name,
            "cost_owner": cost_owner,
            "total_headcount": headcount,
            "pkwtt_headcount": 1,
            "pkwt_headcount": 1,
            "mitra_headcount": headcount - 2,
            "distribution_ratio": 0.25,
            "total_disbursed": disbursed
        })
    }

    async fn department_upstream() -> MockUpstream {
        MockUpstream::canned(&[(
            "/internal_payroll/department_summary",
            json!({
                "status": "success",
                "departments": [
                    department(4, Some("Internal - Finance"), "Finance", 900.0, 9),
                    department(0, None, "Corporate", 10000.0, 10),
                    department(7, Some("Operations"), "Ops Team", 1000.0, 12),
                ],
                "month": 8,
                "year": 2025,
                "count": 3
            }),
        )])
        .await
    }

    #[tokio::test]
    async fn summary_waits_for_month_and_year() {
        let upstream = MockUpstream::canned(&[]).await;
        let (status, body) = get(test_app(&upstream), "/api/v1/payroll/internal/summary?month=08").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disbursed"]["state"], "empty");
        assert_eq!(body["contributions"]["message"], SELECT_PERIOD);
        assert!(upstream.hits().is_empty());
    }

    #[tokio::test]
    async fn summary_marks_department_count_na_for_one_department() {
        let total = |field: &str, value: f64| {
            json!({ "status": "success", field: value, "month": 8, "year": 2025, "dept_id": 4 })
        };
        let upstream = MockUpstream::canned(&[
            ("/internal_payroll/total_payroll_disbursed", total("total_payroll_disbursed", 1500000.0)),
            (
                "/internal_payroll/total_payroll_headcount",
                json!({
                    "status": "success",
                    "total_headcount": 12, "pkwtt_headcount": 5, "pkwt_headcount": 4, "mitra_headcount": 3,
                    "month": 8, "year": 2025, "dept_id": 4
                }),
            ),
            ("/internal_payroll/total_bpsjtk", total("total_bpsjtk", 10.0)),
            ("/internal_payroll/total_kesehatan", total("total_kesehatan", 20.0)),
            ("/internal_payroll/total_pensiun", total("total_pensiun", 30.0)),
        ])
        .await;

        let (status, body) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/summary?month=08&year=2025&department=4&status_kontrak=",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["disbursed"]["data"]["display"], "Rp 1.500.000");
        assert_eq!(body["headcount"]["data"][3]["value"], 3.0);
        assert_eq!(body["department_count"]["data"]["display"], "N/A");
        assert_eq!(body["contributions"]["data"][2]["value"], 30.0);
        assert!(upstream.queries("/internal_payroll/total_department_count").is_empty());
        assert_eq!(
            upstream.queries("/internal_payroll/total_payroll_disbursed"),
            vec!["month=08&year=2025&dept_id=4"]
        );
    }

    #[tokio::test]
    async fn one_failed_contribution_fails_all_three() {
        let total = |field: &str| json!({ "status": "success", field: 1.0, "month": 8, "year": 2025, "dept_id": null });
        let upstream = MockUpstream::canned(&[
            ("/external_payroll/total_payroll_disbursed", total("total_payroll_disbursed")),
            ("/external_payroll/total_bpsjtk", total("total_bpsjtk")),
            ("/external_payroll/total_kesehatan", total("total_kesehatan")),
            (
                "/external_payroll/total_department_count",
                json!({ "status": "success", "total_department_count": 14, "month": 8, "year": 2025 }),
            ),
        ])
        .await;

        let (_, body) = get(test_app(&upstream), "/api/v1/payroll/external/summary?month=08&year=2025").await;
        assert_eq!(body["contributions"]["state"], "failed");
        assert_eq!(body["headcount"]["state"], "failed");
        assert_eq!(body["disbursed"]["state"], "loaded");
        assert_eq!(body["department_count"]["data"]["value"], 14.0);
    }

    #[tokio::test]
    async fn department_table_sorts_totals_and_names() {
        let upstream = department_upstream().await;
        let (status, body) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/departments?month=08&year=2025&rows_per_page=10",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["sort"], json!({ "column": "total_disbursed", "order": "desc" }));
        assert_eq!(data["rows"][0][1]["display"], "Valdo");
        assert_eq!(data["rows"][1][1]["display"], "Operations");
        assert_eq!(data["rows"][2][1]["display"], "Finance");
        assert_eq!(data["rows"][2][7]["display"], "25.00%");
        assert_eq!(data["totals"]["total_headcount"], 31);
        assert_eq!(data["totals"]["count"], 3);

        let (_, body) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/departments?month=08&year=2025&search=fin",
        )
        .await;
        assert_eq!(body["data"]["total_rows"], 1);
        assert_eq!(body["data"]["totals"]["total_disbursed"], 900.0);
    }

    #[tokio::test]
    async fn bad_table_controls_are_rejected() {
        let upstream = department_upstream().await;
        let (status, _) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/departments?month=08&year=2025&sort_by=salary",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(test_app(&upstream), "/api/v1/payroll/internal/departments?month=13&year=2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(test_app(&upstream), "/api/v1/payroll/offshore/departments").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn department_export_is_an_xlsx_attachment() {
        let upstream = department_upstream().await;
        let resp = raw_get(
            test_app(&upstream),
            "/api/v1/payroll/internal/departments/export?month=08&year=2025",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], export::XLSX_CONTENT_TYPE);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"department-summary-08-2025.xlsx\""
        );

        let (status, _) = get(test_app(&upstream), "/api/v1/payroll/internal/departments/export?month=08").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/departments/export?month=08&year=2025&search=nothing-matches",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_reports_upstream_failure_as_bad_gateway() {
        let upstream = MockUpstream::canned(&[]).await;
        let (status, _) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/cost-owners/export?month=08&year=2025",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn month_change_refreshes_departments_and_drops_stale_choice() {
        let upstream = MockUpstream::canned(&[(
            "/internal_payroll/filters",
            json!({
                "status": "success",
                "departments": [
                    { "dept_id": 0, "department_name": null },
                    { "dept_id": 3, "department_name": "Internal - Legal" }
                ]
            }),
        )])
        .await;

        let (status, body) = post_json(
            test_app(&upstream),
            "/api/v1/payroll/internal/filters/change",
            json!({
                "filters": { "month": "07", "year": "2025", "department": "9" },
                "field": "month",
                "value": "08"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["filters"]["month"], "08");
        assert_eq!(body["filters"]["department"], "");
        assert_eq!(body["departments"][1], json!({ "value": "0", "label": "VALDO" }));
        assert_eq!(body["departments"][2]["label"], "INTERNAL - LEGAL");
        assert_eq!(upstream.queries("/internal_payroll/filters"), vec!["month=08&year=2025"]);

        let (_, body) = post_json(
            test_app(&upstream),
            "/api/v1/payroll/internal/filters/change",
            json!({ "filters": { "month": "08", "year": "2025" }, "field": "status_kontrak", "value": "1" }),
        )
        .await;
        assert_eq!(body["filters"]["status_kontrak"], "1");
        assert!(body.get("departments").is_none());
    }

    #[tokio::test]
    async fn monthly_chart_defaults_to_six_months_back() {
        let upstream = MockUpstream::canned(&[(
            "/internal_payroll/monthly",
            json!({
                "status": "success",
                "summaries": {
                    "August 2025": { "total_disbursed": 3.0, "total_headcount": 3, "pkwtt_headcount": 1, "pkwt_headcount": 1, "mitra_headcount": 1 },
                    "February 2025": { "total_disbursed": 1.0, "total_headcount": 1, "pkwtt_headcount": 1, "pkwt_headcount": 0, "mitra_headcount": 0 }
                }
            }),
        )])
        .await;
        let (_, body) = get(
            test_app(&upstream),
            "/api/v1/payroll/internal/monthly?month=08&year=2025&view=headcount",
        )
        .await;
        assert_eq!(body["state"], "loaded");
        assert_eq!(body["data"]["range"], json!({ "start": "02-2025", "end": "08-2025" }));
        assert_eq!(body["data"]["chart"]["categories"], json!(["February 2025", "August 2025"]));
        assert_eq!(body["data"]["chart"]["series"].as_array().unwrap().len(), 4);
        assert_eq!(
            upstream.queries("/internal_payroll/monthly"),
            vec!["start_month=02-2025&end_month=08-2025"]
        );
    }

    #[tokio::test]
    async fn slower_older_request_is_superseded() {
        let summary = json!({
            "status": "success",
            "departments": [department(4, Some("Finance"), "Finance", 900.0, 9)],
            "month": 8,
            "year": 2025,
            "count": 1
        });
        let upstream = MockUpstream::spawn(Router::new().route(
            "/internal_payroll/department_summary",
            axum::routing::get(move |RawQuery(q): RawQuery| {
                let summary = summary.clone();
                async move {
                    if q.unwrap_or_default().contains("month=07") {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                    }
                    Json(summary)
                }
            }),
        ))
        .await;
        let state = test_state(&upstream);
        let session = Uuid::new_v4();

        let slow = tokio::spawn(get_with_session(
            crate::app(state.clone()),
            "/api/v1/payroll/internal/departments?month=07&year=2025",
            session,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, fresh) = get_with_session(
            crate::app(state.clone()),
            "/api/v1/payroll/internal/departments?month=08&year=2025",
            session,
        )
        .await;
        let (_, stale) = slow.await.unwrap();

        assert_eq!(fresh["state"], "loaded");
        assert_eq!(stale["state"], "superseded");
    }

    #[tokio::test]
    async fn picking_a_department_supersedes_the_pending_count() {
        let upstream = MockUpstream::spawn(Router::new().route(
            "/internal_payroll/total_department_count",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({ "status": "success", "total_department_count": 14, "month": 8, "year": 2025 }))
            }),
        ))
        .await;
        let state = test_state(&upstream);
        let session = Uuid::new_v4();

        let slow = tokio::spawn(get_with_session(
            crate::app(state.clone()),
            "/api/v1/payroll/internal/summary?month=08&year=2025",
            session,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, fresh) = get_with_session(
            crate::app(state.clone()),
            "/api/v1/payroll/internal/summary?month=08&year=2025&department=4",
            session,
        )
        .await;
        let (_, stale) = slow.await.unwrap();

        assert_eq!(fresh["department_count"]["data"]["display"], "N/A");
        assert_eq!(stale["department_count"]["state"], "superseded");
        assert_eq!(state.guard.pending(), 0);
    }

    #[tokio::test]
    async fn clearing_the_period_supersedes_the_pending_table() {
        let upstream = MockUpstream::spawn(Router::new().route(
            "/internal_payroll/cost_owner_summary",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({ "status": "success", "cost_owners": [], "month": 8, "year": 2025, "count": 0 }))
            }),
        ))
        .await;
        let state = test_state(&upstream);
        let session = Uuid::new_v4();

        let slow = tokio::spawn(get_with_session(
            crate::app(state.clone()),
            "/api/v1/payroll/internal/cost-owners?month=08&year=2025",
            session,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, fresh) =
            get_with_session(crate::app(state.clone()), "/api/v1/payroll/internal/cost-owners?month=08", session).await;
        let (_, stale) = slow.await.unwrap();

        assert_eq!(fresh["state"], "empty");
        assert_eq!(stale["state"], "superseded");
    }
}
