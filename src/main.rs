// src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod chart;
mod client;
mod config;
mod export;
mod filters;
mod format;
mod models;
mod routes;
mod table;
mod widget;

#[cfg(test)]
mod testing;

use client::ApiClient;
use config::Config;
use widget::WidgetGuard;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub guard: WidgetGuard,
    pub rows_per_page: usize,
}

pub fn app(state: AppState) -> Router {
    // Browser pages are served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // health
        .route("/health", get(routes::health::health))
        .route("/health/upstream", get(routes::health::upstream))
        // option lists
        .route("/api/v1/options", get(routes::options::options))
        // payroll (internal / external)
        .route("/api/v1/payroll/:scope/filters", get(routes::payroll::filters))
        .route("/api/v1/payroll/:scope/filters/change", post(routes::payroll::change_filters))
        .route("/api/v1/payroll/:scope/summary", get(routes::payroll::summary))
        .route("/api/v1/payroll/:scope/monthly", get(routes::payroll::monthly))
        .route("/api/v1/payroll/:scope/departments", get(routes::payroll::departments))
        .route(
            "/api/v1/payroll/:scope/departments/export",
            get(routes::payroll::export_departments),
        )
        .route("/api/v1/payroll/:scope/cost-owners", get(routes::payroll::cost_owners))
        .route(
            "/api/v1/payroll/:scope/cost-owners/export",
            get(routes::payroll::export_cost_owners),
        )
        // loan
        .route("/api/v1/loan/filters", get(routes::loan::filters))
        .route("/api/v1/loan/filters/change", post(routes::loan::change_filters))
        .route("/api/v1/loan/dashboard", get(routes::loan::dashboard))
        .route("/api/v1/loan/activity", get(routes::loan::activity))
        .route("/api/v1/loan/coverage-monthly", get(routes::loan::coverage_monthly))
        .route("/api/v1/loan/repayment-risk-monthly", get(routes::loan::repayment_risk_monthly))
        .route("/api/v1/loan/disbursement-monthly", get(routes::loan::disbursement_monthly))
        .route("/api/v1/loan/overdue", get(routes::loan::overdue))
        .route("/api/v1/loan/overdue/export", get(routes::loan::export_overdue))
        .route("/api/v1/loan/clients", get(routes::loan::clients))
        .route("/api/v1/loan/clients/export", get(routes::loan::export_clients))
        .route("/api/v1/karyawan", get(routes::loan::karyawan))
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("am_dashboard=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState {
        api: client::connect(&config)?,
        guard: WidgetGuard::new(),
        rows_per_page: config.rows_per_page,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "dashboard service listening");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
