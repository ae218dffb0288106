//! Per-request access log records and the sinks that receive them.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Tracing target used for access log events.
pub const ACCESS_LOG_TARGET: &str = "greenroad::access";

/// Structured access log entry, one per completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub request_id: String,
    pub method: String,
    /// Literal request path.
    pub path: String,
    /// Matched route template, or the literal path when nothing matched.
    pub route: String,
    pub status: u16,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// RFC 3339 UTC timestamp of completion.
    pub timestamp: String,
}

/// Receives access log entries. Implementations must not block or fail.
pub trait AccessLog: Send + Sync {
    fn record(&self, entry: AccessLogEntry);
}

/// Emits each entry as an `info` event on the global tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn record(&self, entry: AccessLogEntry) {
        info!(
            target: ACCESS_LOG_TARGET,
            event_name = "http.request",
            request_id = %entry.request_id,
            method = %entry.method,
            path = %entry.path,
            route = %entry.route,
            status = entry.status,
            duration = entry.duration,
            timestamp = %entry.timestamp,
            "{} {} {} {:.6}s",
            entry.method,
            entry.path,
            entry.status,
            entry.duration
        );
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAccessLog {
    entries: Mutex<Vec<AccessLogEntry>>,
}

impl MemoryAccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AccessLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AccessLog for MemoryAccessLog {
    fn record(&self, entry: AccessLogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
