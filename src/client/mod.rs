// src/client/mod.rs
//
// Typed client for the AM API. One `reqwest::Client` shared by every clone;
// no retry, no timeout, no caching.

use std::sync::Arc;

use reqwest::{header, Url};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

pub mod loan;
pub mod payroll;
pub mod query;

pub use query::{Query, QueryValue, ToQuery};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to fetch {endpoint}: {status} {status_text}")]
    Status {
        endpoint: String,
        status: u16,
        status_text: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response body from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid upstream url {url}: {reason}")]
    Url { url: String, reason: String },

    #[error("http client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

/// Result of the upstream connectivity probe.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionCheck {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// `base_url` must not end with `/`; the resolved URL is logged here, once.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let http = reqwest::Client::builder()
            .user_agent(concat!("am-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Setup)?;
        info!(api_url = %base_url, "using AM API");
        Ok(Self { inner: Arc::new(Inner { http, base_url }) })
    }

    pub fn endpoint_url(&self, path: &str, query: &Query) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.inner.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::Url { url: raw.clone(), reason: e.to_string() })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs().iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    pub async fn get_json<T, Q>(&self, path: &str, params: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: ToQuery + ?Sized,
    {
        let url = self.endpoint_url(path, &params.to_query())?;
        debug!(endpoint = path, %url, "upstream request");

        let transport = |source: reqwest::Error| ApiError::Transport { endpoint: path.to_string(), source };
        let resp = self
            .inner
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { endpoint: path.to_string(), source })
    }

    /// Connectivity probe; never fails, the outcome is in the result.
    pub async fn ping(&self, path: &str) -> ConnectionCheck {
        let url = match self.endpoint_url(path, &Query::new()) {
            Ok(url) => url,
            Err(e) => {
                return ConnectionCheck {
                    success: false,
                    url: format!("{}{}", self.inner.base_url, path),
                    status: None,
                    error: Some(e.to_string()),
                }
            }
        };

        match self.inner.http.get(url.clone()).send().await {
            Ok(resp) => ConnectionCheck {
                success: resp.status().is_success(),
                url: url.to_string(),
                status: Some(resp.status().as_u16()),
                error: None,
            },
            Err(e) => ConnectionCheck {
                success: false,
                url: url.to_string(),
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn connect(config: &Config) -> Result<ApiClient, ApiError> {
    ApiClient::new(config.api_url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockUpstream;
    use axum::{http::StatusCode, routing::get, Json, Router};

    #[test]
    fn endpoint_url_has_no_question_mark_without_params() {
        let api = ApiClient::new("http://am.local/api").unwrap();
        let url = api.endpoint_url("/loan/filters", &Query::new()).unwrap();
        assert_eq!(url.as_str(), "http://am.local/api/loan/filters");

        let q = Query::new().required("month", "08").optional("project", "A & B");
        let url = api.endpoint_url("/loan/requests", &q).unwrap();
        assert_eq!(url.query(), Some("month=08&project=A+%26+B"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_status_text() {
        let upstream = MockUpstream::spawn(Router::new().route(
            "/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let api = ApiClient::new(upstream.url()).unwrap();

        let err = api.get_json::<serde_json::Value, _>("/broken", &Query::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), "Failed to fetch /broken: 503 Service Unavailable");
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let upstream = MockUpstream::spawn(
            Router::new().route("/weird", get(|| async { Json(serde_json::json!([1, 2, 3])) })),
        )
        .await;
        let api = ApiClient::new(upstream.url()).unwrap();

        let err = api
            .get_json::<crate::models::loan::LoanFiltersResponse, _>("/weird", &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn ping_reports_status_and_transport_failures() {
        let upstream = MockUpstream::spawn(
            Router::new().route("/health", get(|| async { "ok" })),
        )
        .await;
        let api = ApiClient::new(upstream.url()).unwrap();
        let check = api.ping("/health").await;
        assert!(check.success);
        assert_eq!(check.status, Some(200));

        let check = api.ping("/missing").await;
        assert!(!check.success);
        assert_eq!(check.status, Some(404));

        let dead = ApiClient::new("http://127.0.0.1:1").unwrap();
        let check = dead.ping("/health").await;
        assert!(!check.success);
        assert!(check.error.is_some());
    }
}
