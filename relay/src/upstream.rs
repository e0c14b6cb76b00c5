use crate::errors::RelayError;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Status and fully collected body of an upstream response
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// The service validated requests are forwarded to
#[async_trait]
pub trait Upstream: Send + Sync {
    /// POST a JSON document and collect the complete response.
    async fn post_json(&self, body: Bytes) -> Result<UpstreamResponse, RelayError>;
}

/// Upstream reached over HTTP(S) at a fixed URL
pub struct HttpUpstream {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder().build()?;

        Ok(HttpUpstream {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    /// The timeout covers the entire request/response cycle, including
    /// collecting the body. Expiry drops the in-flight request.
    async fn post_json(&self, body: Bytes) -> Result<UpstreamResponse, RelayError> {
        let exchange = async {
            let response = self
                .client
                .post(self.url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| RelayError::UpstreamRequestFailed(e.to_string()))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| RelayError::ResponseBodyError(e.to_string()))?;

            Ok::<_, RelayError>(UpstreamResponse { status, body })
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| RelayError::UpstreamTimeout(self.timeout))?
    }
}
