pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod upstream;

#[cfg(test)]
mod testutils;

use errors::RelayError;
use shared::http::serve_with_shutdown;
use shared::metrics_defs::describe_all;
use shared::shutdown::shutdown_signal;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use upstream::HttpUpstream;

/// Serves the relay until SIGINT or SIGTERM, then drains in-flight requests.
pub async fn run(config: crate::config::Config) -> Result<(), RelayError> {
    describe_all(metrics_defs::ALL_METRICS);

    let upstream = HttpUpstream::new(config.drts_api.clone(), config.upstream_timeout())?;
    let auth = config.enabled_api_key().is_some();
    tracing::info!(
        upstream = %upstream.url(),
        timeout_secs = config.upstream_timeout_secs,
        response_mode = ?config.response_mode,
        auth,
        "Relay configured"
    );
    if !auth {
        tracing::warn!("API_KEY not set, relay routes are unprotected");
    }

    let app = api::router(&config, Arc::new(upstream));

    let listener = TcpListener::bind(config.addr()).await?;
    tracing::info!(address = %config.addr(), "Listening and serving HTTP");

    serve_with_shutdown(
        listener,
        app,
        shutdown_signal(),
        Duration::from_secs(config.shutdown_timeout_secs),
    )
    .await?;

    tracing::info!("Relay shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ResponseMode};
    use crate::testutils::{MockUpstream, unused_local_url};
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    fn config_for(url: Url) -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 5432,
            drts_api: url,
            upstream_timeout_secs: 5,
            api_key: None,
            response_mode: ResponseMode::Decode,
            shutdown_timeout_secs: 5,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }

    async fn relay_through(config: &Config, body: &'static str) -> (StatusCode, Value) {
        let upstream =
            HttpUpstream::new(config.drts_api.clone(), config.upstream_timeout()).unwrap();
        let app = api::router(config, Arc::new(upstream));

        let request = Request::builder()
            .method("POST")
            .uri("/api/drts")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_end_to_end_pass_through() {
        let mock = MockUpstream::start(StatusCode::OK, r#"{"status":"ok"}"#).await;
        let config = config_for(mock.url("/validate"));

        let (status, body) = relay_through(&config, r#"{"ref_no":"ABC123"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let received = mock.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].path, "/validate");
        assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(received[0].body.as_ref(), br#"{"ref_no":"ABC123"}"#);
    }

    #[tokio::test]
    async fn test_end_to_end_connection_refused() {
        let config = config_for(unused_local_url().await);

        let (status, body) = relay_through(&config, r#"{"ref_no":"ABC123"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Unknown"}));
    }

    #[tokio::test]
    async fn test_end_to_end_validation_never_calls_upstream() {
        let mock = MockUpstream::start(StatusCode::OK, "{}").await;
        let config = config_for(mock.url("/validate"));

        let (status, body) = relay_through(&config, r#"{"ref_no":""}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "ref_no is required"}));
        assert!(mock.received().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_raw_mode() {
        let mock = MockUpstream::start(StatusCode::SERVICE_UNAVAILABLE, "maintenance").await;
        let mut config = config_for(mock.url("/validate"));
        config.response_mode = ResponseMode::Raw;

        let (status, body) = relay_through(&config, r#"{"ref_no":"ABC123"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": "maintenance"}));
    }
}
