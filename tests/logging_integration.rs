//! Installs the global subscriber, so it lives in its own test binary.

use std::io;
use std::sync::{Arc, Mutex};

use greenroad::config::{LogFormat, LoggingConfig};
use greenroad::error::ServerError;
use greenroad::utils::access_log::{AccessLog, AccessLogEntry, TracingAccessLog};
use greenroad::utils::logger::init_logging_with_writer;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl BufferWriter {
    fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
            .collect()
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn json_logging_writes_otel_records_and_installs_once() {
    std::env::remove_var("RUST_LOG");
    let buffer = BufferWriter::default();
    let config = LoggingConfig {
        level: "info".to_string(),
        format: LogFormat::Json,
        service_name: "greenroad".to_string(),
        service_version: "9.9.9".to_string(),
        ..LoggingConfig::default()
    };

    init_logging_with_writer(&config, buffer.clone()).expect("first install succeeds");

    tracing::debug!("filtered out at info");
    tracing::info!(port = 3000u16, "Server started on port {}", 3000);
    TracingAccessLog.record(AccessLogEntry {
        request_id: "req-7".to_string(),
        method: "GET".to_string(),
        path: "/ready".to_string(),
        route: "/ready".to_string(),
        status: 200,
        duration: 0.001,
        timestamp: "2026-10-14T12:00:00.000Z".to_string(),
    });

    let records = buffer.records();
    assert_eq!(records.len(), 2, "{records:?}");

    let started = &records[0];
    assert_eq!(started["body"], "Server started on port 3000");
    assert_eq!(started["severity_text"], "INFO");
    assert_eq!(started["severity_number"], 9);
    assert_eq!(started["resource"]["service.name"], "greenroad");
    assert_eq!(started["resource"]["service.version"], "9.9.9");
    assert_eq!(started["attributes"]["port"], 3000);
    assert!(started["timestamp"].as_str().unwrap().ends_with('Z'));

    let access = &records[1];
    assert_eq!(access["body"], "GET /ready 200 0.001000s");
    assert_eq!(access["attributes"]["event.name"], "http.request");
    assert_eq!(access["attributes"]["request_id"], "req-7");

    let second = init_logging_with_writer(&config, BufferWriter::default());
    assert!(matches!(second, Err(ServerError::Logging(_))), "{second:?}");
}
