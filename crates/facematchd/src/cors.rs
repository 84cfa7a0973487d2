use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// Build the CORS layer for the configured origins.
///
/// `*` allows any origin. Returns `None` when no usable origin remains,
/// which leaves cross-origin requests blocked.
pub fn build_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let mut any = false;
    let mut origins = Vec::new();

    for raw in allowed_origins {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            any = true;
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(v) => origins.push(v),
            Err(_) => tracing::warn!(origin = value, "ignoring invalid CORS origin"),
        }
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if any {
        Some(layer.allow_origin(Any))
    } else if !origins.is_empty() {
        Some(layer.allow_origin(origins))
    } else {
        tracing::warn!("no valid CORS origins configured; cross-origin requests will be rejected");
        None
    }
}
