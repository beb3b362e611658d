//! Metrics definitions for attribution capture and the event relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const ATTRIBUTION_CAPTURED: MetricDef = MetricDef {
    name: "attribution.captured",
    metric_type: MetricType::Counter,
    description: "Requests or page loads that carried at least one tracking parameter. Tagged with store.",
};

pub const ATTRIBUTION_COOKIE_INVALID: MetricDef = MetricDef {
    name: "attribution.cookie.invalid",
    metric_type: MetricType::Counter,
    description: "Existing attribution cookies that failed to decode and were treated as empty",
};

pub const ATTRIBUTION_COOKIE_FAILED: MetricDef = MetricDef {
    name: "attribution.cookie.failed",
    metric_type: MetricType::Counter,
    description: "Captures that could not be written to the cookie",
};

pub const RELAY_EVENTS: MetricDef = MetricDef {
    name: "relay.events",
    metric_type: MetricType::Counter,
    description: "Events delivered to an analytics backend. Tagged with backend.",
};

pub const RELAY_FAILURES: MetricDef = MetricDef {
    name: "relay.failures",
    metric_type: MetricType::Counter,
    description: "Events an analytics backend failed to accept. Tagged with backend.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    ATTRIBUTION_CAPTURED,
    ATTRIBUTION_COOKIE_INVALID,
    ATTRIBUTION_COOKIE_FAILED,
    RELAY_EVENTS,
    RELAY_FAILURES,
];
