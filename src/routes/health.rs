// src/routes/health.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::client::ConnectionCheck;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResp { pub status: &'static str, pub version: &'static str }

pub async fn health() -> Json<HealthResp> {
    Json(HealthResp { status: "ok", version: "v1" })
}

/// Probes the AM API's `/health`; 502 when it cannot be reached or is unhealthy.
pub async fn upstream(State(state): State<AppState>) -> (StatusCode, Json<ConnectionCheck>) {
    let check = state.api.ping("/health").await;
    let status = if check.success { StatusCode::OK } else { StatusCode::BAD_GATEWAY };
    (status, Json(check))
}
