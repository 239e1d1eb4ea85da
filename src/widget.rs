// src/widget.rs
//
// Every dashboard panel is a widget: it is empty until month and year are
// picked, then loaded or failed. A response that settles after a newer
// request for the same panel was issued comes back as `superseded`.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::client::ApiError;
use crate::format;

pub const SESSION_HEADER: &str = "x-dashboard-session";
pub const SELECT_PERIOD: &str = "Please select month and year to view data";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Widget<T> {
    Empty {
        message: String,
    },
    Loaded {
        data: T,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failed {
        error: String,
    },
    Superseded {
        sequence: u64,
    },
}

impl<T> Widget<T> {
    pub fn awaiting_period() -> Self {
        Self::Empty { message: SELECT_PERIOD.to_string() }
    }

    pub fn loaded(data: T, message: Option<String>) -> Self {
        Self::Loaded { data, message }
    }

    /// Failures are logged here and rendered as a placeholder, never a 5xx.
    pub fn failed(widget: &str, err: &ApiError) -> Self {
        error!(widget, error = %err, "widget fetch failed");
        Self::Failed { error: err.to_string() }
    }

    pub fn from_result<U>(widget: &str, result: Result<U, ApiError>, build: impl FnOnce(U) -> Self) -> Self {
        match result {
            Ok(value) => build(value),
            Err(e) => Self::failed(widget, &e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Dashboard session id sent by the browser; absent or malformed means none.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}

// ───────────────────────────────────────
// Stale-response guard
// ───────────────────────────────────────

#[derive(Debug)]
pub struct Ticket {
    key: Option<(Uuid, String)>,
    sequence: u64,
}

/// Latest sequence handed out per (session, widget).
#[derive(Clone, Default)]
pub struct WidgetGuard {
    latest: Arc<Mutex<HashMap<(Uuid, String), u64>>>,
    next: Arc<AtomicU64>,
}

impl WidgetGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Taken before the upstream fetch starts.
    pub fn issue(&self, session: Option<Uuid>, widget: &str) -> Ticket {
        let sequence = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let key = session.map(|s| (s, widget.to_string()));
        if let Some(key) = &key {
            let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
            latest.insert(key.clone(), sequence);
        }
        Ticket { key, sequence }
    }

    #[cfg(test)]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let Some(key) = &ticket.key else {
            return true;
        };
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.get(key) == Some(&ticket.sequence)
    }

    /// The latest ticket for a key drops its entry on settle; a key with no
    /// entry has no request in flight, so any older ticket is stale.
    pub fn settle<T>(&self, ticket: Ticket, widget: Widget<T>) -> Widget<T> {
        let Some(key) = &ticket.key else {
            return widget;
        };
        let current = {
            let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
            if latest.get(key) == Some(&ticket.sequence) {
                latest.remove(key);
                true
            } else {
                false
            }
        };
        if current {
            return widget;
        }
        debug!(sequence = ticket.sequence, "discarding stale widget response");
        Widget::Superseded { sequence: ticket.sequence }
    }

    /// (session, widget) keys with a request still in flight.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// ───────────────────────────────────────
// Tiles
// ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub title: &'static str,
    pub value: Option<f64>,
    pub display: String,
}

impl Tile {
    pub fn currency(title: &'static str, value: f64) -> Self {
        Self { title, value: Some(value), display: format::rupiah(value) }
    }

    pub fn count(title: &'static str, value: i64) -> Self {
        Self { title, value: Some(value as f64), display: format::count(value) }
    }

    pub fn rate(title: &'static str, value: f64) -> Self {
        Self { title, value: Some(value), display: format::percent(value) }
    }

    pub fn days(title: &'static str, value: f64) -> Self {
        Self { title, value: Some(value), display: format::days(value) }
    }

    pub fn not_available(title: &'static str) -> Self {
        Self { title, value: None, display: "N/A".to_string() }
    }
}
