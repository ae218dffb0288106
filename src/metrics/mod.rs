//! Metrics collection and exposition for Prometheus.
//!
//! This module provides centralized request metrics recording

mod recorder;

pub use recorder::{Metrics, MetricsRecorder, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
