use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{index, match_face};
use crate::state::AppState;

pub fn build_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/match-face", post(match_face))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        }));

    match cors {
        Some(layer) => router.layer(layer),
        None => router,
    }
}
