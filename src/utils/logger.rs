use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LogSink, LoggingConfig};
use crate::error::ServerError;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};

#[derive(Default)]
struct JsonFieldVisitor {
    fields: Map<String, Value>,
}

impl JsonFieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFieldVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::from(format!("{:?}", value)));
    }
}

/// Writes each event as one JSON object shaped after the OpenTelemetry log
/// data model: `timestamp`, `severity_*`, `body`, `resource`, `attributes`.
#[derive(Clone)]
pub struct OtelJsonEventFormatter {
    service_name: String,
    service_version: String,
}

impl OtelJsonEventFormatter {
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        OtelJsonEventFormatter {
            service_name: service_name.into(),
            service_version: service_version.into(),
        }
    }

    fn severity_number(level: &Level) -> u64 {
        match *level {
            Level::TRACE => 1,
            Level::DEBUG => 5,
            Level::INFO => 9,
            Level::WARN => 13,
            Level::ERROR => 17,
        }
    }
}

impl<S, N> FormatEvent<S, N> for OtelJsonEventFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        let mut attributes = visitor.fields;
        if let Some(v) = attributes.remove("event_name") {
            attributes.insert("event.name".to_string(), v);
        }
        if let Some(span) = ctx.lookup_current() {
            attributes.insert("span.name".to_string(), Value::from(span.name()));
        }
        if let Some(file) = metadata.file() {
            attributes.insert("code.filepath".to_string(), Value::from(file));
        }
        if let Some(line) = metadata.line() {
            attributes.insert("code.lineno".to_string(), Value::from(line));
        }
        attributes.insert("code.target".to_string(), Value::from(metadata.target()));

        let body = match attributes.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => metadata.name().to_string(),
        };

        let resource = Map::from_iter([
            ("service.name".to_string(), Value::from(self.service_name.as_str())),
            ("service.version".to_string(), Value::from(self.service_version.as_str())),
        ]);

        let root = Map::from_iter([
            (
                "timestamp".to_string(),
                Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            ("severity_text".to_string(), Value::from(metadata.level().as_str())),
            (
                "severity_number".to_string(),
                Value::from(Self::severity_number(metadata.level())),
            ),
            ("body".to_string(), Value::from(body)),
            ("resource".to_string(), Value::Object(resource)),
            ("attributes".to_string(), Value::Object(attributes)),
        ]);

        let serialized =
            serde_json::to_string(&Value::Object(root)).map_err(|_| std::fmt::Error)?;
        writer.write_str(&serialized)?;
        writer.write_char('\n')
    }
}

/// Parses a `logging.level` value.
pub fn parse_level(level: &str) -> Result<LevelFilter, ServerError> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        _ => Err(ServerError::Logging(format!(
            "invalid logging.level '{}'. Valid values: trace, debug, info, warn, error",
            level
        ))),
    }
}

/// Installs the global subscriber, writing to the configured sink.
pub fn init_logging(logging_config: &LoggingConfig) -> Result<(), ServerError> {
    match logging_config.sink {
        LogSink::Stdout => init_logging_with_writer(logging_config, std::io::stdout),
        LogSink::Stderr => init_logging_with_writer(logging_config, std::io::stderr),
    }
}

/// Installs the global subscriber with an arbitrary writer, e.g. a file
/// appender or a network sink.
pub fn init_logging_with_writer<W>(
    logging_config: &LoggingConfig,
    writer: W,
) -> Result<(), ServerError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let level_filter = parse_level(&logging_config.level)?;

    // RUST_LOG directives refine the configured default
    let filter_layer = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let result = match logging_config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter_layer)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .event_format(OtelJsonEventFormatter::new(
                        logging_config.service_name.clone(),
                        logging_config.service_version.clone(),
                    )),
            )
            .try_init(),
        LogFormat::Console => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_writer(writer).pretty())
            .try_init(),
    };

    result.map_err(|e| ServerError::Logging(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::test_support::BufferWriter;
    use super::*;
    use tracing::info;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("INFO").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" debug ").unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn json_formatter_emits_one_object_per_event() {
        let buffer = BufferWriter::default();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(buffer.clone())
                .event_format(OtelJsonEventFormatter::new("greenroad", "1.0.0")),
        );

        tracing::subscriber::with_default(subscriber, || {
            info!(port = 3000u64, "Server started on port 3000");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);

        let record: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["body"], "Server started on port 3000");
        assert_eq!(record["severity_text"], "INFO");
        assert_eq!(record["severity_number"], 9);
        assert_eq!(record["resource"]["service.name"], "greenroad");
        assert_eq!(record["resource"]["service.version"], "1.0.0");
        assert_eq!(record["attributes"]["port"], 3000);
        assert!(record["attributes"].get("message").is_none());
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
