// src/client/payroll.rs

use crate::filters::{
    ContractStatus, FilterError, MonthYearFilters, PayrollFilters, PayrollScope, Period, ValdoInc,
};
use crate::models::payroll::*;

use super::{ApiClient, ApiError, Query, ToQuery};

/// `/filters`: month and year narrow the department list when given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepartmentFilterParams {
    pub period: Option<Period>,
}

impl ToQuery for DepartmentFilterParams {
    fn to_query(&self) -> Query {
        Query::new().optional_period(self.period)
    }
}

/// Period totals: disbursed, headcount and the three contribution totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollTotalParams {
    pub period: Period,
    pub dept_id: Option<u32>,
    pub status_kontrak: Option<ContractStatus>,
    pub valdo_inc: Option<ValdoInc>,
}

impl PayrollTotalParams {
    pub fn from_filters(period: Period, filters: &PayrollFilters) -> Result<Self, FilterError> {
        Ok(Self {
            period,
            dept_id: filters.dept_id()?,
            status_kontrak: filters.contract_status()?,
            valdo_inc: filters.entity()?,
        })
    }
}

impl ToQuery for PayrollTotalParams {
    fn to_query(&self) -> Query {
        Query::new()
            .period(self.period)
            .optional("dept_id", &self.dept_id)
            .optional("status_kontrak", &self.status_kontrak)
            .optional("valdo_inc", &self.valdo_inc)
    }
}

/// `/monthly`: bounds go out as `MM-YYYY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollMonthlyParams {
    pub start: Period,
    pub end: Period,
    pub dept_id: Option<u32>,
    pub status_kontrak: Option<ContractStatus>,
    pub valdo_inc: Option<ValdoInc>,
}

impl ToQuery for PayrollMonthlyParams {
    fn to_query(&self) -> Query {
        Query::new()
            .required("start_month", &self.start.month_year())
            .required("end_month", &self.end.month_year())
            .optional("dept_id", &self.dept_id)
            .optional("status_kontrak", &self.status_kontrak)
            .optional("valdo_inc", &self.valdo_inc)
    }
}

/// Department and cost-owner breakdowns; never scoped to one department.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollBreakdownParams {
    pub period: Period,
    pub status_kontrak: Option<ContractStatus>,
    pub valdo_inc: Option<ValdoInc>,
}

impl PayrollBreakdownParams {
    pub fn from_filters(period: Period, filters: &MonthYearFilters) -> Result<Self, FilterError> {
        Ok(Self {
            period,
            status_kontrak: filters.contract_status()?,
            valdo_inc: filters.entity()?,
        })
    }
}

impl ToQuery for PayrollBreakdownParams {
    fn to_query(&self) -> Query {
        Query::new()
            .period(self.period)
            .optional("status_kontrak", &self.status_kontrak)
            .optional("valdo_inc", &self.valdo_inc)
    }
}

fn path(scope: PayrollScope, endpoint: &str) -> String {
    format!("/{}/{endpoint}", scope.prefix())
}

impl ApiClient {
    pub async fn payroll_filters(
        &self,
        scope: PayrollScope,
        params: &DepartmentFilterParams,
    ) -> Result<DepartmentFiltersResponse, ApiError> {
        self.get_json(&path(scope, "filters"), params).await
    }

    pub async fn total_payroll_disbursed(
        &self,
        scope: PayrollScope,
        params: &PayrollTotalParams,
    ) -> Result<TotalPayrollDisbursedResponse, ApiError> {
        self.get_json(&path(scope, "total_payroll_disbursed"), params).await
    }

    pub async fn total_payroll_headcount(
        &self,
        scope: PayrollScope,
        params: &PayrollTotalParams,
    ) -> Result<TotalPayrollHeadcountResponse, ApiError> {
        self.get_json(&path(scope, "total_payroll_headcount"), params).await
    }

    pub async fn total_bpjstk(
        &self,
        scope: PayrollScope,
        params: &PayrollTotalParams,
    ) -> Result<TotalBpjstkResponse, ApiError> {
        self.get_json(&path(scope, "total_bpsjtk"), params).await
    }

    pub async fn total_kesehatan(
        &self,
        scope: PayrollScope,
        params: &PayrollTotalParams,
    ) -> Result<TotalKesehatanResponse, ApiError> {
        self.get_json(&path(scope, "total_kesehatan"), params).await
    }

    pub async fn total_pensiun(
        &self,
        scope: PayrollScope,
        params: &PayrollTotalParams,
    ) -> Result<TotalPensiunResponse, ApiError> {
        self.get_json(&path(scope, "total_pensiun"), params).await
    }

    pub async fn payroll_monthly(
        &self,
        scope: PayrollScope,
        params: &PayrollMonthlyParams,
    ) -> Result<PayrollMonthlyResponse, ApiError> {
        self.get_json(&path(scope, "monthly"), params).await
    }

    pub async fn department_summary(
        &self,
        scope: PayrollScope,
        params: &PayrollBreakdownParams,
    ) -> Result<DepartmentSummaryResponse, ApiError> {
        self.get_json(&path(scope, "department_summary"), params).await
    }

    pub async fn cost_owner_summary(
        &self,
        scope: PayrollScope,
        params: &PayrollBreakdownParams,
    ) -> Result<CostOwnerSummaryResponse, ApiError> {
        self.get_json(&path(scope, "cost_owner_summary"), params).await
    }

    pub async fn total_department_count(
        &self,
        scope: PayrollScope,
        params: &PayrollBreakdownParams,
    ) -> Result<TotalDepartmentCountResponse, ApiError> {
        self.get_json(&path(scope, "total_department_count"), params).await
    }
}
