// src/client/query.rs
//
// One rule for every endpoint: required keys always go out, optional keys
// only when they carry a non-empty value.

use chrono::NaiveDate;

use crate::filters::{ContractStatus, LoanType, Period, ValdoInc};

/// Renders a value for the query string; `None` means "nothing to send".
pub trait QueryValue {
    fn query_value(&self) -> Option<String>;
}

impl QueryValue for str {
    fn query_value(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl QueryValue for String {
    fn query_value(&self) -> Option<String> {
        self.as_str().query_value()
    }
}

impl<T: QueryValue + ?Sized> QueryValue for &T {
    fn query_value(&self) -> Option<String> {
        (**self).query_value()
    }
}

impl<T: QueryValue> QueryValue for Option<T> {
    fn query_value(&self) -> Option<String> {
        self.as_ref().and_then(QueryValue::query_value)
    }
}

macro_rules! numeric_query_value {
    ($($t:ty),*) => {
        $(impl QueryValue for $t {
            fn query_value(&self) -> Option<String> {
                Some(self.to_string())
            }
        })*
    };
}

numeric_query_value!(u32, i32, i64);

impl QueryValue for NaiveDate {
    fn query_value(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }
}

impl QueryValue for ContractStatus {
    fn query_value(&self) -> Option<String> {
        Some(self.code().to_string())
    }
}

impl QueryValue for ValdoInc {
    fn query_value(&self) -> Option<String> {
        Some(self.code().to_string())
    }
}

impl QueryValue for LoanType {
    fn query_value(&self) -> Option<String> {
        Some(self.as_str().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<V: QueryValue + ?Sized>(mut self, key: &'static str, value: &V) -> Self {
        self.pairs.push((key, value.query_value().unwrap_or_default()));
        self
    }

    pub fn optional<V: QueryValue + ?Sized>(mut self, key: &'static str, value: &V) -> Self {
        if let Some(v) = value.query_value() {
            self.pairs.push((key, v));
        }
        self
    }

    /// `month` as "MM" and `year`, both required.
    pub fn period(self, period: Period) -> Self {
        self.required("month", &period.month_param())
            .required("year", &period.year)
    }

    /// `month` and `year` when a period is selected.
    pub fn optional_period(self, period: Option<Period>) -> Self {
        self.optional("month", &period.map(Period::month_param))
            .optional("year", &period.map(|p| p.year))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}

/// Typed request options of one upstream endpoint.
pub trait ToQuery {
    fn to_query(&self) -> Query;
}

impl ToQuery for Query {
    fn to_query(&self) -> Query {
        self.clone()
    }
}
