//! # OpenTelemetry span event to log connector
//!
//! Turns the events recorded on spans into OTLP log records, so that
//! exceptions, retries and similar point-in-time facts can be searched and
//! alerted on like any other log line.
//!
//! For each event of an [`ExportTraceServiceRequest`] that passes the event
//! filter the connector:
//!
//! * resolves a severity from configured attribute mappings, a dedicated
//!   severity attribute, or a match on the event name, defaulting to `info`;
//! * builds the log body and attributes from the event, its span and the
//!   span context;
//! * groups the record under the resource and scope the span came from.
//!
//! The resulting [`ExportLogsServiceRequest`] is handed to a
//! [`LogsConsumer`] in a single call, or not at all when nothing was
//! converted.
//!
//! ## Example
//!
//! ```no_run
//! use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
//! use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
//! use opentelemetry_spanevent_connector::{
//!     Config, ConsumeResult, LogsConsumer, SpanEventToLogConnector,
//! };
//!
//! #[derive(Debug)]
//! struct PrintConsumer;
//!
//! impl LogsConsumer for PrintConsumer {
//!     fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult {
//!         println!("{:?}", logs);
//!         Ok(())
//!     }
//! }
//!
//! let config = Config::from_yaml(
//!     r#"
//! include_event_names: [exception]
//! severity_by_event_name:
//!   exception: error
//! add_level: true
//! "#,
//! )?;
//! let connector = SpanEventToLogConnector::new(config, PrintConsumer)?;
//! connector.consume_traces(&ExportTraceServiceRequest::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate feature flags
//!
//! * `internal-logs` (enabled by default): emits the connector's own
//!   diagnostics through the `opentelemetry` internal logging macros.
//! * `testing`: exposes [`testing::InMemoryLogsConsumer`].
//! * `with-serde`: enables serde support on the OTLP types.
//!
//! [`ExportTraceServiceRequest`]: opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest
//! [`ExportLogsServiceRequest`]: opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

mod attributes;
mod config;
mod connector;
mod error;
mod filter;
mod grouper;
mod resolver;
mod severity;

#[cfg(feature = "testing")]
pub mod testing;

pub use attributes::{span_kind_name, LEVEL_KEY, SPAN_KIND_KEY, SPAN_NAME_KEY, TRACE_STATE_KEY};
pub use config::{AttributeMappings, AttributeSource, Config};
pub use connector::{
    log_record_count, Capabilities, LogsConsumer, SpanEventToLogConnector, COMPONENT_TYPE,
    STABILITY,
};
pub use error::{ConfigError, ConsumeError, ConsumeResult};
pub use filter::EventFilter;
pub use resolver::ResolvedSeverity;
pub use severity::{severity_text_for_number, Severity, DEFAULT_SEVERITY_TEXT};
