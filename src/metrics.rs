// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Webhook gate --------
pub static WEBHOOKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webhook_requests_total", "webhook requests by outcome"),
        &["outcome"],
    )
    .unwrap()
});

// -------- Exchange client --------
pub static ORDERS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orders_submitted_total", "signed orders sent to the exchange").unwrap()
});

pub static ORDER_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("order_results_total", "order placement results (label: result)"),
        &["result"],
    )
    .unwrap()
});

// Latency of the single order call (milliseconds)
pub static LAT_EXCHANGE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("exchange_latency_ms", "Latency of order placement call (ms)")
            .buckets(vec![25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]),
    )
    .unwrap()
});

// ---- Config visibility ----
pub static CONFIG_SIGN_SCHEME: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("config_sign_scheme", "active signing scheme (label: scheme)"),
        &["scheme"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry; double init is harmless
    for m in [
        REGISTRY.register(Box::new(WEBHOOKS.clone())),
        REGISTRY.register(Box::new(ORDERS_SUBMITTED.clone())),
        REGISTRY.register(Box::new(ORDER_RESULTS.clone())),
        REGISTRY.register(Box::new(LAT_EXCHANGE.clone())),
        REGISTRY.register(Box::new(CONFIG_SIGN_SCHEME.clone())),
    ] {
        let _ = m;
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
