// src/testing.rs
//
// Stand-in for the AM API in tests: a real axum server on 127.0.0.1:0 that
// remembers every request it answered.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get as get_route,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::widget::{WidgetGuard, SESSION_HEADER};
use crate::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub path: String,
    pub query: String,
}

type Hits = Arc<Mutex<Vec<Hit>>>;

pub struct MockUpstream {
    addr: SocketAddr,
    hits: Hits,
}

async fn record(State(hits): State<Hits>, req: Request, next: Next) -> Response {
    hits.lock().unwrap().push(Hit {
        path: req.uri().path().to_string(),
        query: req.uri().query().unwrap_or_default().to_string(),
    });
    next.run(req).await
}

impl MockUpstream {
    pub async fn spawn(router: Router) -> Self {
        let hits: Hits = Arc::default();
        let app = router.layer(middleware::from_fn_with_state(hits.clone(), record));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, hits }
    }

    /// Every path answers `200` with its canned JSON body.
    pub async fn canned(routes: &[(&str, Value)]) -> Self {
        let router = routes.iter().fold(Router::new(), |router, (path, body)| {
            let body = body.clone();
            router.route(
                path,
                get_route(move || {
                    let body = body.clone();
                    async move { Json(body) }
                }),
            )
        });
        Self::spawn(router).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    /// Query strings received on `path`, oldest first.
    pub fn queries(&self, path: &str) -> Vec<String> {
        self.hits()
            .into_iter()
            .filter(|h| h.path == path)
            .map(|h| h.query)
            .collect()
    }
}

// ───────────────────────────────────────
// Driving the dashboard router
// ───────────────────────────────────────

pub fn test_state(upstream: &MockUpstream) -> AppState {
    AppState {
        api: ApiClient::new(upstream.url()).unwrap(),
        guard: WidgetGuard::new(),
        rows_per_page: 25,
    }
}

pub fn test_app(upstream: &MockUpstream) -> Router {
    crate::app(test_state(upstream))
}

pub async fn raw_get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Status plus JSON body (`Null` when the body is not JSON).
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    json_body(raw_get(app, uri).await).await
}

pub async fn get_with_session(app: Router, uri: &str, session: Uuid) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(uri)
        .header(SESSION_HEADER, session.to_string())
        .body(Body::empty())
        .unwrap();
    json_body(app.oneshot(req).await.unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    json_body(app.oneshot(req).await.unwrap()).await
}
