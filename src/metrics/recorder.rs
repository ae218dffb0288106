//! Metrics recording implementation using Prometheus.

use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::debug;

use crate::config::MetricsConfig;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

const REQUEST_LABELS: &[&str] = &["method", "route", "status_code"];

/// Trait for recording HTTP request metrics.
///
/// Recording never fails from the caller's point of view: a sample that
/// cannot be recorded is dropped.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Counts one completed request.
    fn record_http_request(&self, method: &str, route: &str, status_code: &str);

    /// Records the duration of a completed request.
    fn record_http_duration(
        &self,
        duration_secs: f64,
        method: &str,
        route: &str,
        status_code: &str,
    );
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    ///
    /// Fails if the configured buckets are invalid or an instrument name is
    /// registered twice.
    pub fn new(config: &MetricsConfig) -> Result<Self, prometheus::Error> {
        let duration_opts = HistogramOpts::new(
            HTTP_REQUEST_DURATION_SECONDS,
            "Duration of HTTP requests in seconds",
        )
        .buckets(config.duration_buckets.clone());

        // HistogramVec only checks buckets when a labelled child is created
        Histogram::with_opts(duration_opts.clone())?;

        let metrics = Metrics {
            registry: Arc::new(Registry::new()),
            http_requests_total: IntCounterVec::new(
                Opts::new(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests"),
                REQUEST_LABELS,
            )?,
            http_request_duration_seconds: HistogramVec::new(duration_opts, REQUEST_LABELS)?,
        };

        metrics.register(Box::new(metrics.http_requests_total.clone()))?;
        metrics.register(Box::new(metrics.http_request_duration_seconds.clone()))?;

        if config.process_metrics {
            metrics.register_process_collector()?;
        }

        Ok(metrics)
    }

    /// Adds a collector to the registry. A collector whose metric names are
    /// already registered is rejected with `AlreadyReg`.
    pub fn register(&self, collector: Box<dyn Collector>) -> Result<(), prometheus::Error> {
        self.registry.register(collector)
    }

    #[cfg(target_os = "linux")]
    fn register_process_collector(&self) -> Result<(), prometheus::Error> {
        use prometheus::process_collector::ProcessCollector;
        self.register(Box::new(ProcessCollector::for_self()))
    }

    #[cfg(not(target_os = "linux"))]
    fn register_process_collector(&self) -> Result<(), prometheus::Error> {
        Ok(())
    }

    /// Renders all metrics in Prometheus text format.
    ///
    /// Families come out sorted by name and label pairs sorted by label name.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Current value of `http_requests_total` for one label combination,
    /// or zero if it has never been recorded.
    pub fn request_count(&self, method: &str, route: &str, status_code: &str) -> u64 {
        let wanted = [method, route, status_code];
        self.http_requests_total
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let labels = metric.get_label();
                labels.len() == wanted.len()
                    && REQUEST_LABELS.iter().zip(wanted).all(|(name, value)| {
                        labels
                            .iter()
                            .any(|pair| pair.get_name() == *name && pair.get_value() == value)
                    })
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .unwrap_or(0)
    }
}

impl MetricsRecorder for Metrics {
    fn record_http_request(&self, method: &str, route: &str, status_code: &str) {
        match self
            .http_requests_total
            .get_metric_with_label_values(&[method, route, status_code])
        {
            Ok(counter) => counter.inc(),
            Err(e) => debug!("Dropping request count sample: {}", e),
        }
    }

    fn record_http_duration(
        &self,
        duration_secs: f64,
        method: &str,
        route: &str,
        status_code: &str,
    ) {
        match self
            .http_request_duration_seconds
            .get_metric_with_label_values(&[method, route, status_code])
        {
            Ok(histogram) => histogram.observe(duration_secs),
            Err(e) => debug!("Dropping request duration sample: {}", e),
        }
    }
}
