use shared::metrics_defs::{MetricDef, MetricType};

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "data_proxy.cache.hit",
    metric_type: MetricType::Counter,
    description: "Data-proxy requests served from the response cache. Tagged with provider.",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "data_proxy.cache.miss",
    metric_type: MetricType::Counter,
    description: "Data-proxy requests forwarded upstream. Tagged with provider.",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "data_proxy.upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream request duration in seconds. Tagged with provider, outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[CACHE_HIT, CACHE_MISS, UPSTREAM_DURATION];
