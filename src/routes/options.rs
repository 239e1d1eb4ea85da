// src/routes/options.rs

use axum::{extract::State, Json};
use serde::Serialize;

use crate::filters::{self, LoanType, Period, SelectOption};
use crate::table::ROWS_PER_PAGE_OPTIONS;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Defaults {
    pub month: String,
    pub year: String,
    pub loan_type: &'static str,
    pub rows_per_page: usize,
}

#[derive(Debug, Serialize)]
pub struct OptionsResp {
    pub months: Vec<SelectOption>,
    pub years: Vec<SelectOption>,
    /// `MM-YYYY` bounds for the payroll monthly chart
    pub month_ranges: Vec<SelectOption>,
    pub contract_statuses: Vec<SelectOption>,
    pub entities: Vec<SelectOption>,
    pub loan_types: Vec<SelectOption>,
    pub rows_per_page_options: [usize; 4],
    pub defaults: Defaults,
}

fn options_for(now: Period, rows_per_page: usize) -> OptionsResp {
    OptionsResp {
        months: filters::month_options(),
        years: filters::year_options(now.year),
        month_ranges: filters::month_year_options(now.year),
        contract_statuses: filters::contract_options(),
        entities: filters::entity_options(),
        loan_types: filters::loan_type_options(),
        rows_per_page_options: ROWS_PER_PAGE_OPTIONS,
        defaults: Defaults {
            month: now.month_param(),
            year: now.year.to_string(),
            loan_type: LoanType::default().as_str(),
            rows_per_page,
        },
    }
}

/// Static option lists plus the page-mount defaults (current month and year).
pub async fn options(State(state): State<AppState>) -> Json<OptionsResp> {
    Json(options_for(Period::current(), state.rows_per_page))
}
