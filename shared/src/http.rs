use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Builds a JSON error response carrying the canonical reason of the status code.
pub fn make_error_response(status_code: StatusCode) -> Response {
    let message = status_code
        .canonical_reason()
        .unwrap_or("an error occurred");

    (status_code, axum::Json(ErrorBody { error: message })).into_response()
}

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// Once the shutdown future completes the listener stops accepting new
/// connections and in-flight requests are given up to `drain_timeout` to
/// finish. Connections still open after the deadline are dropped.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (draining_tx, draining_rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = draining_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    // Serve normally until either the server exits on its own or draining starts
    tokio::select! {
        result = &mut server => return result,
        _ = draining_rx => {}
    }

    match tokio::time::timeout(drain_timeout, server).await {
        Ok(result) => {
            tracing::info!("All in-flight requests drained");
            result
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Drain timeout elapsed, dropping remaining connections"
            );
            Ok(())
        }
    }
}
