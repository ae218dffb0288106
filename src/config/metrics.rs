use serde::{Deserialize, Serialize};

/// Settings for the Prometheus registry.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    /// Also export process CPU/memory/fd metrics (Linux only).
    pub process_metrics: bool,
    /// Upper bounds of the request duration histogram, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            process_metrics: true,
            duration_buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        }
    }
}
