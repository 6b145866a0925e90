//! Prometheus metrics for the Mosaic runtime.
//!
//! All metrics follow the naming convention: `mosaic_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., load attempts)
//! - **Gauge**: Value that can go up or down (e.g., mounted modules)
//! - **Histogram**: Distribution of values (e.g., load duration)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Messages emitted on the event bus
    pub static ref EVENT_BUS_MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("mosaic_eventbus_messages_sent_total", "Messages emitted on the event bus"),
        &["source"]
    ).expect("metric creation failed");

    /// Handlers that panicked during dispatch
    pub static ref EVENT_BUS_HANDLER_PANICS: Counter = Counter::new(
        "mosaic_eventbus_handler_panics_total",
        "Event handlers that panicked during dispatch"
    ).expect("metric creation failed");

    // =========================================================================
    // MODULE LOADER METRICS
    // =========================================================================

    /// Load attempts by outcome
    pub static ref MODULE_LOAD_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("mosaic_loader_attempts_total", "Module load attempts"),
        &["outcome"]  // outcome: mounted/retry/failed
    ).expect("metric creation failed");

    /// Currently mounted remote modules
    pub static ref MODULES_MOUNTED: Gauge = Gauge::new(
        "mosaic_loader_modules_mounted",
        "Number of remote modules currently mounted"
    ).expect("metric creation failed");

    /// Time from load request to mounted
    pub static ref MODULE_LOAD_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "mosaic_loader_load_duration_seconds",
            "Time from load request until the module is mounted"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // ISOLATION BOUNDARY METRICS
    // =========================================================================

    /// Failures contained by isolation boundaries
    pub static ref BOUNDARY_CRASHES: Counter = Counter::new(
        "mosaic_boundary_crashes_total",
        "Remote module failures contained by an isolation boundary"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR REPORTER METRICS
    // =========================================================================

    /// Accepted error reports
    pub static ref ERROR_REPORTS: CounterVec = CounterVec::new(
        Opts::new("mosaic_errors_reported_total", "Accepted error reports"),
        &["category", "severity"]
    ).expect("metric creation failed");

    /// Reports dropped before storage
    pub static ref ERROR_REPORTS_DROPPED: CounterVec = CounterVec::new(
        Opts::new("mosaic_errors_dropped_total", "Error reports dropped before storage"),
        &["reason"]  // reason: throttled/capacity
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event Bus
        Box::new(EVENT_BUS_MESSAGES_SENT.clone()),
        Box::new(EVENT_BUS_HANDLER_PANICS.clone()),
        // Loader
        Box::new(MODULE_LOAD_ATTEMPTS.clone()),
        Box::new(MODULES_MOUNTED.clone()),
        Box::new(MODULE_LOAD_DURATION.clone()),
        // Boundary
        Box::new(BOUNDARY_CRASHES.clone()),
        // Errors
        Box::new(ERROR_REPORTS.clone()),
        Box::new(ERROR_REPORTS_DROPPED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
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
    armed: bool,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
            armed: true,
        }
    }

    /// Record now instead of on drop.
    pub fn observe(self) {}

    /// Drop without recording.
    pub fn discard(mut self) {
        self.armed = false;
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        if self.armed {
            let duration = self.start.elapsed().as_secs_f64();
            self.histogram.observe(duration);
        }
    }
}
