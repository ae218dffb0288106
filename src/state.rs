//! Shared application state.
//!
//! Contains the context that is shared across all request handlers and the
//! instrumentation middleware: configuration, metrics, the access log sink,
//! process information and the random source.

use crate::config::Config;
use crate::metrics::Metrics;
use crate::utils::access_log::AccessLog;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Facts about the running process, fixed at startup.
#[derive(Debug)]
pub struct ProcessState {
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
    port: u16,
}

impl ProcessState {
    pub fn new(port: u16) -> Self {
        ProcessState {
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            port,
        }
    }

    /// Seconds since startup. Monotonic.
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at_utc
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Application state shared across all HTTP handlers.
///
/// This state is cloned for each request handler; every field is a cheap
/// handle onto state built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<Config>,
    /// Prometheus registry and request instruments.
    pub metrics: Metrics,
    /// Sink for per-request access log records.
    pub access_log: Arc<dyn AccessLog>,
    pub process: Arc<ProcessState>,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Builds the state for a server listening on `port`. The random source is
    /// seeded from `config.random_seed` when set.
    pub fn new(
        config: Arc<Config>,
        metrics: Metrics,
        access_log: Arc<dyn AccessLog>,
        port: u16,
    ) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        AppState {
            config,
            metrics,
            access_log,
            process: Arc::new(ProcessState::new(port)),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Runs `f` with exclusive access to the random source.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}
