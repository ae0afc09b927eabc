//! Prometheus instrumentation for the write pipeline and query engine:
//! a counter of writes committed/rolled back, a histogram of query
//! latency, and a gauge of cache hit rate.
//!
//! No HTTP exporter lives here — wiring `MetricsRegistry::gather` to an
//! endpoint belongs to the HTTP layer, which is out of scope.

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder};

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    static ref WRITE_TRANSACTIONS: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("receipt_write_transactions_total", "Write transactions by outcome"),
        &["outcome"],
    )
    .expect("metric names are valid");
    static ref QUERY_LATENCY_SECONDS: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new("receipt_query_latency_seconds", "Query engine latency"),
        &["outcome"],
    )
    .expect("metric names are valid");
    static ref CACHE_HIT_RATE: IntGauge = IntGauge::new(
        "receipt_query_cache_hit_permille",
        "Query cache hit rate in hits per thousand lookups",
    )
    .expect("metric names are valid");
}

/// Registers every metric with the process-global registry. Safe to call
/// more than once; subsequent registrations of the same metric are no-ops.
pub fn init() {
    let _ = REGISTRY.register(Box::new(WRITE_TRANSACTIONS.clone()));
    let _ = REGISTRY.register(Box::new(QUERY_LATENCY_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_HIT_RATE.clone()));
}

pub fn record_write_committed() {
    WRITE_TRANSACTIONS.with_label_values(&["committed"]).inc();
}

pub fn record_write_rolled_back() {
    WRITE_TRANSACTIONS.with_label_values(&["rolled_back"]).inc();
}

pub fn record_query_latency(seconds: f64, outcome: &str) {
    QUERY_LATENCY_SECONDS.with_label_values(&[outcome]).observe(seconds);
}

/// Tracks a running count of cache hits/total lookups as a permille gauge,
/// since `prometheus::Gauge` has no built-in ratio type.
pub fn set_cache_hit_rate(hits: u64, total: u64) {
    let permille = if total == 0 { 0 } else { (hits * 1000 / total) as i64 };
    CACHE_HIT_RATE.set(permille);
}

/// Renders every registered metric in the Prometheus text exposition
/// format, for a caller to serve however it chooses (no HTTP server is
/// started here).
pub fn gather() -> Result<String, prometheus::Error> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
