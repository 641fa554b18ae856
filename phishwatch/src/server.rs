// HTTP shell: POST /analyze and a liveness route

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use phishwatch_core::{AnalysisError, AnalysisRequest, Verdict, analyze_request};
use phishwatch_model::ModelClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub const LIVENESS_MESSAGE: &str = "Phishing Analyzer Running";

/// Default cap on request bodies; screenshots make these large
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    client: Arc<dyn ModelClient>,
}

/// Error body returned to the collector
pub struct ApiError(AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "Analysis failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(client: Arc<dyn ModelClient>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/analyze", post(analyze_page))
        .with_state(AppState { client })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_http_request))
}

/// Serve until ctrl-c
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Phishwatch listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    info!("Phishwatch shutting down");
    Ok(())
}

async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

async fn analyze_page(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Verdict>, ApiError> {
    let request = AnalysisRequest::from_json_slice(&body).map_err(AnalysisError::from)?;
    let verdict = analyze_request(state.client.as_ref(), &request).await?;
    Ok(Json(verdict))
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();
    let response = next.run(req).await;
    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
