// src/client/loan.rs

use chrono::NaiveDate;

use crate::filters::{LoanFilters, LoanType, Period};
use crate::models::loan::*;

use super::{ApiClient, ApiError, Query, ToQuery};

/// Employer / placement / project narrowing shared by the loan endpoints.
/// Placement goes out as `sourced_to`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanScope {
    pub employer: Option<String>,
    pub sourced_to: Option<String>,
    pub project: Option<String>,
}

impl LoanScope {
    pub fn from_filters(filters: &LoanFilters) -> Self {
        Self {
            employer: filters.employer(),
            sourced_to: filters.placement(),
            project: filters.project(),
        }
    }

    fn apply(&self, query: Query) -> Query {
        query
            .optional("employer", &self.employer)
            .optional("sourced_to", &self.sourced_to)
            .optional("project", &self.project)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KaryawanParams {
    pub klient: Option<String>,
}

impl ToQuery for KaryawanParams {
    fn to_query(&self) -> Query {
        Query::new().optional("klient", &self.klient)
    }
}

/// `/loan/filters`: the option lists cascade on employer and placement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanFilterParams {
    pub employer: Option<String>,
    pub placement: Option<String>,
    pub loan_type: Option<LoanType>,
}

impl ToQuery for LoanFilterParams {
    fn to_query(&self) -> Query {
        Query::new()
            .optional("employer", &self.employer)
            .optional("placement", &self.placement)
            .optional("loan_type", &self.loan_type)
    }
}

/// Period endpoints. `loan_type` is `None` for `/loan/requests` and
/// `/loan/disbursement`, which do not accept it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanPeriodParams {
    pub scope: LoanScope,
    pub id_karyawan: Option<i64>,
    pub period: Option<Period>,
    pub loan_type: Option<LoanType>,
}

impl LoanPeriodParams {
    pub fn new(filters: &LoanFilters, period: Option<Period>, loan_type: Option<LoanType>) -> Self {
        Self {
            scope: LoanScope::from_filters(filters),
            id_karyawan: None,
            period,
            loan_type,
        }
    }
}

impl ToQuery for LoanPeriodParams {
    fn to_query(&self) -> Query {
        self.scope
            .apply(Query::new())
            .optional("id_karyawan", &self.id_karyawan)
            .optional_period(self.period)
            .optional("loan_type", &self.loan_type)
    }
}

/// `*-monthly` endpoints, bounded by `YYYY-MM-DD` dates.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRangeParams {
    pub scope: LoanScope,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub loan_type: Option<LoanType>,
}

impl ToQuery for LoanRangeParams {
    fn to_query(&self) -> Query {
        self.scope
            .apply(Query::new())
            .required("start_date", &self.start_date)
            .required("end_date", &self.end_date)
            .optional("loan_type", &self.loan_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientSummaryParams {
    pub period: Period,
    pub loan_type: LoanType,
}

impl ToQuery for ClientSummaryParams {
    fn to_query(&self) -> Query {
        Query::new().period(self.period).required("loan_type", &self.loan_type)
    }
}

impl ApiClient {
    pub async fn karyawan(&self, params: &KaryawanParams) -> Result<KaryawanResponse, ApiError> {
        self.get_json("/karyawan", params).await
    }

    pub async fn loan_filters(&self, params: &LoanFilterParams) -> Result<LoanFiltersResponse, ApiError> {
        self.get_json("/loan/filters", params).await
    }

    pub async fn karyawan_overdue(
        &self,
        params: &LoanPeriodParams,
    ) -> Result<KaryawanOverdueResponse, ApiError> {
        self.get_json("/loan/karyawan-overdue", params).await
    }

    pub async fn coverage_utilization(
        &self,
        params: &LoanPeriodParams,
    ) -> Result<CoverageUtilizationResponse, ApiError> {
        self.get_json("/loan/coverage-utilization", params).await
    }

    pub async fn coverage_utilization_monthly(
        &self,
        params: &LoanRangeParams,
    ) -> Result<CoverageUtilizationMonthlyResponse, ApiError> {
        self.get_json("/loan/coverage-utilization-monthly", params).await
    }

    pub async fn repayment_risk(
        &self,
        params: &LoanPeriodParams,
    ) -> Result<RepaymentRiskResponse, ApiError> {
        self.get_json("/loan/repayment-risk", params).await
    }

    pub async fn repayment_risk_monthly(
        &self,
        params: &LoanRangeParams,
    ) -> Result<RepaymentRiskMonthlyResponse, ApiError> {
        self.get_json("/loan/repayment-risk-monthly", params).await
    }

    pub async fn loan_requests(
        &self,
        params: &LoanPeriodParams,
    ) -> Result<LoanRequestsResponse, ApiError> {
        let params = LoanPeriodParams { loan_type: None, ..params.clone() };
        self.get_json("/loan/requests", &params).await
    }

    pub async fn loan_disbursement(
        &self,
        params: &LoanPeriodParams,
    ) -> Result<LoanDisbursementResponse, ApiError> {
        let params = LoanPeriodParams { loan_type: None, ..params.clone() };
        self.get_json("/loan/disbursement", &params).await
    }

    pub async fn loan_disbursement_monthly(
        &self,
        params: &LoanRangeParams,
    ) -> Result<LoanDisbursementMonthlyResponse, ApiError> {
        let params = LoanRangeParams { loan_type: None, ..params.clone() };
        self.get_json("/loan/disbursement-monthly", &params).await
    }

    pub async fn loan_purpose(&self, params: &LoanPeriodParams) -> Result<LoanPurposeResponse, ApiError> {
        self.get_json("/loan/loan-purpose", params).await
    }

    pub async fn client_summary(
        &self,
        params: &ClientSummaryParams,
    ) -> Result<ClientSummaryResponse, ApiError> {
        self.get_json("/loan/client-summary", params).await
    }
}
