use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with method, status.",
};

pub const AUTOFIX_START: MetricDef = MetricDef {
    name: "autofix.start",
    metric_type: MetricType::Counter,
    description: "Autofix start attempts. Tagged with outcome.",
};

pub const AUTOFIX_TIMEOUT: MetricDef = MetricDef {
    name: "autofix.timeout",
    metric_type: MetricType::Counter,
    description: "Timeout checks processed by the watchdog. Tagged with outcome.",
};

pub const SEER_REQUEST_DURATION: MetricDef = MetricDef {
    name: "seer.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of autofix requests to Seer in seconds. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    AUTOFIX_START,
    AUTOFIX_TIMEOUT,
    SEER_REQUEST_DURATION,
];
