use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "relay.requests",
    metric_type: MetricType::Counter,
    description: "Relay requests handled, including those rejected by the API key check. Tagged with status.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "relay.request.duration",
    metric_type: MetricType::Histogram,
    description: "Relay request duration in seconds, including the upstream call",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "relay.upstream.errors",
    metric_type: MetricType::Counter,
    description: "Relay requests that failed with a server error. Tagged with kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS, REQUEST_DURATION, UPSTREAM_ERRORS];
