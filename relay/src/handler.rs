use crate::config::ResponseMode;
use crate::errors::RelayError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS, UPSTREAM_ERRORS};
use crate::upstream::{Upstream, UpstreamResponse};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

/// State shared by every relay request
#[derive(Clone)]
pub struct RelayState {
    pub upstream: Arc<dyn Upstream>,
    pub response_mode: ResponseMode,
}

/// The validated payload forwarded upstream
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayRequest {
    pub ref_no: String,
}

#[derive(Deserialize)]
struct IncomingRelayRequest {
    ref_no: Option<String>,
}

impl RelayRequest {
    /// Parses and validates an inbound body.
    ///
    /// The body must be a JSON object. A `ref_no` that is missing, `null` or
    /// empty is reported separately from a malformed body. Fields other than
    /// `ref_no` are dropped.
    pub fn parse(body: &[u8]) -> Result<Self, RelayError> {
        let object: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| RelayError::InvalidBody(e.to_string()))?;
        let incoming = IncomingRelayRequest::deserialize(Value::Object(object))
            .map_err(|e| RelayError::InvalidBody(e.to_string()))?;

        match incoming.ref_no {
            Some(ref_no) if !ref_no.is_empty() => Ok(RelayRequest { ref_no }),
            _ => Err(RelayError::MissingRefNo),
        }
    }
}

/// Liveness check.
pub async fn handle_ping() -> &'static str {
    "pong"
}

/// Validates the inbound body, forwards it upstream and shapes the reply.
///
/// A body that cannot be collected, including one over the configured size
/// limit, is answered like any other invalid body.
pub async fn handle_relay(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();

    let result = match body {
        Ok(body) => relay(&state, &body).await,
        Err(rejection) => Err(RelayError::InvalidBody(rejection.body_text())),
    };

    let response = match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(error) => {
            if error.status().is_server_error() {
                shared::counter!(UPSTREAM_ERRORS, "kind" => error.kind()).increment(1);
                tracing::error!(error = %error, "Relay request failed");
            } else {
                tracing::warn!(error = %error, "Rejected relay request");
            }
            error.into_response()
        }
    };

    shared::counter!(REQUESTS, "status" => response.status().as_str().to_owned()).increment(1);
    shared::histogram!(REQUEST_DURATION).record(start.elapsed().as_secs_f64());

    response
}

async fn relay(state: &RelayState, body: &[u8]) -> Result<Value, RelayError> {
    let request = RelayRequest::parse(body)?;
    tracing::debug!(ref_no = %request.ref_no, "Relaying request");

    let payload = serde_json::to_vec(&request).map(Bytes::from)?;
    let upstream_response = state.upstream.post_json(payload).await?;

    shape_response(state.response_mode, upstream_response)
}

fn shape_response(mode: ResponseMode, response: UpstreamResponse) -> Result<Value, RelayError> {
    match mode {
        ResponseMode::Decode => {
            if response.status != StatusCode::OK {
                return Err(RelayError::UpstreamStatus(response.status));
            }
            // Only the leading JSON value is read; anything after it is ignored.
            // A leading value that is not an object is relayed as `{}`.
            let first = serde_json::Deserializer::from_slice(&response.body)
                .into_iter::<Map<String, Value>>()
                .next();
            let object = match first {
                Some(Ok(object)) => object,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Upstream body is not a JSON object");
                    Map::new()
                }
                None => {
                    tracing::warn!("Upstream body is empty");
                    Map::new()
                }
            };
            Ok(Value::Object(object))
        }
        ResponseMode::Raw => Ok(json!({ "data": String::from_utf8_lossy(&response.body) })),
    }
}
