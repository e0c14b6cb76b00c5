use crate::auth::require_api_key;
use crate::config::Config;
use crate::handler::{RelayState, handle_ping, handle_relay};
use crate::upstream::Upstream;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use http::StatusCode;
use shared::http::make_error_response;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the relay's HTTP surface.
///
/// `/ping` is always open. `/drts` and `/api/drts` are guarded by the API key
/// when one is configured.
pub fn router(config: &Config, upstream: Arc<dyn Upstream>) -> Router {
    let state = RelayState {
        upstream,
        response_mode: config.response_mode,
    };

    let mut relay_routes = Router::new()
        .route("/drts", post(handle_relay))
        .route("/api/drts", post(handle_relay))
        .route_layer(DefaultBodyLimit::max(config.max_body_bytes));

    if let Some(api_key) = config.enabled_api_key() {
        relay_routes = relay_routes.route_layer(middleware::from_fn_with_state(
            Arc::new(api_key.clone()),
            require_api_key,
        ));
    }

    Router::new()
        .route("/ping", get(handle_ping))
        .merge(relay_routes)
        .fallback(|| async { make_error_response(StatusCode::NOT_FOUND) })
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
