// src/routes/mod.rs

use std::{fmt::Display, future::Future};

use axum::http::StatusCode;
use tracing::error;
use uuid::Uuid;

use crate::export::ExportError;
use crate::widget::Widget;
use crate::AppState;

pub mod health;
pub mod loan;
pub mod options;
pub mod payroll;

pub type HandlerError = (StatusCode, String);

// Common error mappers
pub fn internal_error<E: Display>(e: E) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error: {e}"))
}

pub fn bad_request<E: Display>(e: E) -> HandlerError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

pub fn upstream_error<E: Display>(e: E) -> HandlerError {
    error!(error = %e, "upstream request failed");
    (StatusCode::BAD_GATEWAY, format!("upstream error: {e}"))
}

pub fn export_error(e: ExportError) -> HandlerError {
    match e {
        ExportError::Empty => (StatusCode::NOT_FOUND, e.to_string()),
        ExportError::Xlsx(_) => internal_error(e),
    }
}

/// Runs one widget fetch under a fresh ticket; a newer request for the same
/// session and widget turns this result into `superseded`.
pub async fn guarded<T, F>(state: &AppState, session: Option<Uuid>, widget: &str, fetch: F) -> Widget<T>
where
    F: Future<Output = Widget<T>>,
{
    let ticket = state.guard.issue(session, widget);
    let result = fetch.await;
    state.guard.settle(ticket, result)
}

/// An answer that needs no fetch (N/A, awaiting a period) still takes a
/// ticket, so an older fetch for the same widget settles as `superseded`.
pub fn settled<T>(state: &AppState, session: Option<Uuid>, widget: &str, answer: Widget<T>) -> Widget<T> {
    let ticket = state.guard.issue(session, widget);
    state.guard.settle(ticket, answer)
}
