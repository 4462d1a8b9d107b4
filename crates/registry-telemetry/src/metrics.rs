//! Prometheus metrics for the service registry.
//!
//! All metrics follow the naming convention: `registry_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ADVERTISER METRICS
    // =========================================================================

    /// Advertisements published on the watch topic
    pub static ref ADVERTISEMENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("registry_advertisements_published_total", "Advertisements published"),
        &["action"]  // action: register/deregister
    ).expect("metric creation failed");

    /// Advertisements that could not be published
    pub static ref ADVERTISEMENT_FAILURES: Counter = Counter::new(
        "registry_advertisement_failures_total",
        "Advertisements that failed to publish"
    ).expect("metric creation failed");

    /// Nodes currently held by local stores
    pub static ref LOCAL_NODES: Gauge = Gauge::new(
        "registry_local_nodes",
        "Number of nodes registered through this process"
    ).expect("metric creation failed");

    // =========================================================================
    // RESOLVER METRICS
    // =========================================================================

    /// Resolution attempts by outcome
    pub static ref QUERIES: CounterVec = CounterVec::new(
        Opts::new("registry_queries_total", "Service resolutions by outcome"),
        &["outcome"]  // outcome: complete/partial/not_found/cancelled/unavailable
    ).expect("metric creation failed");

    /// Distinct replies accepted by resolvers
    pub static ref QUERY_REPLIES: Counter = Counter::new(
        "registry_query_replies_total",
        "Distinct advertiser replies accepted"
    ).expect("metric creation failed");

    /// Resolution latency
    pub static ref QUERY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "registry_query_duration_seconds",
            "Time spent resolving a service"
        ).buckets(vec![0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("metric creation failed");

    // =========================================================================
    // WATCHER METRICS
    // =========================================================================

    /// Watch deltas emitted
    pub static ref WATCH_EVENTS: CounterVec = CounterVec::new(
        Opts::new("registry_watch_events_total", "Watch events delivered to consumers"),
        &["action", "source"]  // source: bus/expiry
    ).expect("metric creation failed");

    /// Open watch streams
    pub static ref ACTIVE_WATCHES: Gauge = Gauge::new(
        "registry_active_watches",
        "Number of open watch streams"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Advertiser
        Box::new(ADVERTISEMENTS_PUBLISHED.clone()),
        Box::new(ADVERTISEMENT_FAILURES.clone()),
        Box::new(LOCAL_NODES.clone()),
        // Resolver
        Box::new(QUERIES.clone()),
        Box::new(QUERY_REPLIES.clone()),
        Box::new(QUERY_DURATION.clone()),
        // Watcher
        Box::new(WATCH_EVENTS.clone()),
        Box::new(ACTIVE_WATCHES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
