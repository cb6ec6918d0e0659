use crate::app::event_search_use_case::EventSearchUseCase;
use crate::common::constants::SERVICE_NAME;
use crate::common::error::SearchError;
use crate::common::types::SearchRequest;
use crate::observability::metrics;
use axum::{
    body::Bytes,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<EventSearchUseCase>,
    pub environment: String,
}

async fn root() -> impl IntoResponse {
    "API is up. Try GET /health or POST /events"
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn version(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn events_hint() -> impl IntoResponse {
    Json(serde_json::json!({
        "hint": "POST /events with { location: 'City, ST', interests: [..], date: 'YYYY-MM-DD' }"
    }))
}

async fn render_metrics() -> Response {
    match metrics::render() {
        Some(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// An absent body is an empty query; a present but unparseable one is rejected.
fn parse_request(body: &[u8]) -> Result<SearchRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SearchRequest::default());
    }
    serde_json::from_slice(body)
}

async fn search_events(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting /events body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let request_id = Uuid::new_v4();
    let span = info_span!("events_request", %request_id);
    let started = Instant::now();

    match state.use_case.search(&request).instrument(span).await {
        Ok(resp) => {
            metrics::request::completed("ok", started.elapsed().as_secs_f64(), resp.items.len());
            Json(resp).into_response()
        }
        Err(SearchError::Config(message)) => {
            error!(%request_id, "Configuration error: {}", message);
            metrics::request::completed("config_error", started.elapsed().as_secs_f64(), 0);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
        Err(e) => {
            error!(%request_id, "Request failed: {}", e);
            metrics::request::completed("error", started.elapsed().as_secs_f64(), 0);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

/// Create the HTTP server with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/metrics", get(render_metrics))
        .route("/events", get(events_hint).post(search_events))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port, stopping on Ctrl-C
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("API listening on http://localhost:{}", port);
    info!("Health check: http://localhost:{}/health", port);

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
