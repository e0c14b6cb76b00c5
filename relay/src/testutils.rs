use crate::errors::RelayError;
use crate::upstream::{Upstream, UpstreamResponse};
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::response::IntoResponse;
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use metrics::{
    Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// Loopback HTTP server answering every request with a canned response
pub struct MockUpstream {
    port: u16,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockUpstream {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            body,
            delay,
            received: received.clone(),
        };
        let app = Router::new().fallback(record).with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockUpstream { port, received }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}{}", self.port, path)).unwrap()
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn record(State(state): State<MockState>, request: Request) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    state.received.lock().unwrap().push(ReceivedRequest {
        path: parts.uri.path().to_string(),
        content_type: parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });

    tokio::time::sleep(state.delay).await;
    (state.status, state.body)
}

/// URL of a loopback port with nothing listening on it
pub async fn unused_local_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}

/// In-process upstream returning a fixed result and recording every call
pub struct FakeUpstream {
    result: Box<dyn Fn() -> Result<UpstreamResponse, RelayError> + Send + Sync>,
    calls: Mutex<Vec<Bytes>>,
}

impl FakeUpstream {
    pub fn responding(status: StatusCode, body: &'static str) -> Self {
        FakeUpstream {
            result: Box::new(move || {
                Ok(UpstreamResponse {
                    status,
                    body: Bytes::from_static(body.as_bytes()),
                })
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> RelayError) -> Self {
        FakeUpstream {
            result: Box::new(move || Err(error())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Bytes> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn post_json(&self, body: Bytes) -> Result<UpstreamResponse, RelayError> {
        self.calls.lock().unwrap().push(body);
        (self.result)()
    }
}

/// Recorder keeping counter totals in memory; gauges and histograms are dropped
#[derive(Default)]
pub struct CapturingRecorder {
    counters: Mutex<HashMap<Key, Arc<AtomicCounter>>>,
}

#[derive(Default)]
struct AtomicCounter(AtomicU64);

impl CounterFn for AtomicCounter {
    fn increment(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn absolute(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

impl CapturingRecorder {
    pub fn counter(&self, name: &'static str, labels: &[(&'static str, &'static str)]) -> u64 {
        let labels: Vec<metrics::Label> = labels
            .iter()
            .map(|(k, v)| metrics::Label::new(*k, *v))
            .collect();
        let key = Key::from_parts(name, labels);

        self.counters
            .lock()
            .unwrap()
            .get(&key)
            .map_or(0, |counter| counter.0.load(Ordering::Relaxed))
    }
}

impl Recorder for CapturingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let counter = self
            .counters
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .clone();
        Counter::from_arc(counter)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
