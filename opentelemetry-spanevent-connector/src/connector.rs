//! The span event to log connector.
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use opentelemetry::{otel_debug, otel_warn};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::{span::Event, Span};

use crate::attributes::AttributeComposer;
use crate::config::{AttributeSource, Config};
use crate::error::{ConfigError, ConsumeResult};
use crate::filter::EventFilter;
use crate::grouper::{LogsBatchBuilder, ResourceId, ScopeId};
use crate::resolver::{ResolvedSeverity, SeverityResolver};

/// Component type name of the connector.
pub const COMPONENT_TYPE: &str = "spaneventtolog";

/// Stability level of the connector.
pub const STABILITY: &str = "alpha";

/// `LogsConsumer` receives the log batches produced by the connector.
pub trait LogsConsumer: Send + Sync + Debug {
    /// Takes ownership of a non-empty batch of logs.
    ///
    /// The whole batch is handed over in one call. Any error is returned to
    /// the caller of [`SpanEventToLogConnector::consume_traces`] as is.
    fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult;
}

impl<T: LogsConsumer + ?Sized> LogsConsumer for Arc<T> {
    fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult {
        (**self).consume_logs(logs)
    }
}

impl<T: LogsConsumer + ?Sized> LogsConsumer for Box<T> {
    fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult {
        (**self).consume_logs(logs)
    }
}

/// What the connector does to the data it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the input batch is modified.
    pub mutates_data: bool,
}

/// Converts span events into log records and forwards them to a
/// [`LogsConsumer`].
///
/// The connector holds no state between batches; concurrent calls on
/// independent batches are safe.
#[derive(Debug)]
pub struct SpanEventToLogConnector<C> {
    config: Config,
    filter: EventFilter,
    resolver: SeverityResolver,
    composer: AttributeComposer,
    consumer: C,
}

impl<C: LogsConsumer> SpanEventToLogConnector<C> {
    /// Validates `config` and builds a connector delivering to `consumer`.
    pub fn new(config: Config, consumer: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = SeverityResolver::new(&config);
        otel_debug!(
            name: "SpanEventToLogConnector.Created",
            include_event_names = config.include_event_names.len(),
            include_span_context = config.include_span_context,
            severity_stages = resolver.stage_count(),
            add_level = config.add_level,
        );

        Ok(SpanEventToLogConnector {
            filter: EventFilter::new(config.include_event_names.iter().cloned()),
            composer: AttributeComposer::new(&config),
            resolver,
            config,
            consumer,
        })
    }

    /// The configuration this connector was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The downstream consumer.
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// The event filter built from `include_event_names`.
    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Severity a log record built from `event` would carry.
    pub fn resolve_severity(&self, event: &Event) -> ResolvedSeverity {
        self.resolver.resolve(event)
    }

    /// The connector only reads its input.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            mutates_data: false,
        }
    }

    /// Lifecycle hook; there is nothing to start.
    pub fn start(&self) -> ConsumeResult {
        Ok(())
    }

    /// Lifecycle hook; there is nothing to release.
    pub fn shutdown(&self) -> ConsumeResult {
        Ok(())
    }

    /// Converts the span events of `traces` and hands the resulting logs to
    /// the consumer.
    ///
    /// The consumer is not called when no event was converted.
    pub fn consume_traces(&self, traces: &ExportTraceServiceRequest) -> ConsumeResult {
        let logs = self.extract_logs(traces);
        let count = log_record_count(&logs);
        if count == 0 {
            otel_debug!(
                name: "SpanEventToLogConnector.NoLogs",
                resource_spans = traces.resource_spans.len(),
            );
            return Ok(());
        }

        otel_debug!(name: "SpanEventToLogConnector.ConsumeLogs", log_records = count);
        self.consumer.consume_logs(logs).map_err(|err| {
            otel_warn!(
                name: "SpanEventToLogConnector.ConsumeLogsFailed",
                log_records = count,
                error = format!("{}", err),
            );
            err
        })
    }

    /// Converts every span event of `traces` that passes the event filter
    /// into a log record, grouped by source resource and scope.
    ///
    /// Pure: neither the input nor the connector is modified.
    pub fn extract_logs(&self, traces: &ExportTraceServiceRequest) -> ExportLogsServiceRequest {
        if traces.resource_spans.is_empty() {
            return ExportLogsServiceRequest::default();
        }

        let observed_time_unix_nano = to_nanos(SystemTime::now());
        let mut builder =
            LogsBatchBuilder::new(self.config.copies_from(AttributeSource::ResourceAttributes));

        for (resource_index, resource_spans) in traces.resource_spans.iter().enumerate() {
            for (scope_index, scope_spans) in resource_spans.scope_spans.iter().enumerate() {
                for span in &scope_spans.spans {
                    for event in &span.events {
                        if !self.filter.includes(&event.name) {
                            continue;
                        }
                        let record = self.populate_log_record(event, span, observed_time_unix_nano);
                        builder.push(
                            ResourceId(resource_index),
                            resource_spans,
                            ScopeId(scope_index),
                            scope_spans,
                            record,
                        );
                    }
                }
            }
        }

        otel_debug!(
            name: "SpanEventToLogConnector.Extracted",
            log_records = builder.record_count(),
        );
        builder.finish()
    }

    fn populate_log_record(
        &self,
        event: &Event,
        span: &Span,
        observed_time_unix_nano: u64,
    ) -> LogRecord {
        let severity = self.resolver.resolve(event);
        let mut record = LogRecord {
            time_unix_nano: event.time_unix_nano,
            observed_time_unix_nano,
            severity_number: severity.number,
            severity_text: severity.text.into_owned(),
            ..Default::default()
        };
        self.composer.compose(&mut record, event, span);
        record
    }
}

/// Total number of log records in `logs`.
pub fn log_record_count(logs: &ExportLogsServiceRequest) -> usize {
    logs.resource_logs
        .iter()
        .flat_map(|resource_logs| &resource_logs.scope_logs)
        .map(|scope_logs| scope_logs.log_records.len())
        .sum()
}

fn to_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos() as u64
}
