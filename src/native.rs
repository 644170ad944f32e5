use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::generator::BuildPointGenerator;
use crate::handler::{handle_build_event, HandleError, HandleResponse};
use crate::sink::PointSink;

/// Initialize tracing subscriber on stderr, keeping stdout for command output.
/// Uses RUST_LOG env var for filtering (defaults to info).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(true))
        .with(filter)
        .init();
}

#[derive(Clone)]
struct AppState {
    generator: Arc<BuildPointGenerator>,
    sink: Arc<dyn PointSink>,
}

/// Router accepting build events on `/v1/builds`
pub fn build_router(sink: Arc<dyn PointSink>) -> Router {
    let state = AppState {
        generator: Arc::new(BuildPointGenerator::new()),
        sink,
    };
    Router::new()
        .route("/v1/builds", post(handle_builds_axum))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

fn status_for(err: &HandleError) -> StatusCode {
    match err {
        HandleError::Decompress(_) | HandleError::Decode(_) => StatusCode::BAD_REQUEST,
        HandleError::Generate(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HandleError::SendFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn handle_builds_axum(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<HandleResponse>, (StatusCode, String)> {
    let is_gzipped = headers
        .get("content-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    handle_build_event(
        body,
        is_gzipped,
        state.generator.as_ref(),
        state.sink.as_ref(),
    )
    .await
    .map(Json)
    .map_err(|e| (status_for(&e), e.to_string()))
}
