//! Static shared-secret check on the relay routes.

use crate::config::ApiKey;
use crate::errors::RelayError;
use crate::metrics_defs::REQUESTS;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use std::sync::Arc;
use subtle::ConstantTimeEq;

impl ApiKey {
    /// Compares `provided` against the configured key in constant time.
    pub fn matches(&self, provided: &[u8]) -> bool {
        let expected = self.as_str().as_bytes();
        provided.len() == expected.len() && provided.ct_eq(expected).into()
    }
}

/// Rejects requests whose `Authorization` header is missing or differs from
/// the configured key. The header value is compared verbatim, without any
/// scheme prefix.
pub async fn require_api_key(
    State(api_key): State<Arc<ApiKey>>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = match request.headers().get(AUTHORIZATION) {
        None => Err(RelayError::MissingCredential),
        Some(value) if value.is_empty() => Err(RelayError::MissingCredential),
        Some(value) if api_key.matches(value.as_bytes()) => Ok(()),
        Some(_) => Err(RelayError::InvalidCredential),
    };

    let error = match verdict {
        Ok(()) => return next.run(request).await,
        Err(error) => error,
    };

    tracing::warn!(
        path = %request.uri().path(),
        error = %error,
        "Rejected unauthenticated request"
    );
    shared::counter!(REQUESTS, "status" => error.status().as_str().to_owned()).increment(1);
    error.into_response()
}
