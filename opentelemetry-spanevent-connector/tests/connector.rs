use std::collections::HashMap;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{
    any_value::Value, AnyValue, InstrumentationScope, KeyValue,
};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, SeverityNumber};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::{Event, SpanKind};
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span};
use opentelemetry_spanevent_connector::testing::{
    InMemoryLogsConsumer, InMemoryLogsConsumerBuilder,
};
use opentelemetry_spanevent_connector::{
    log_record_count, AttributeMappings, AttributeSource, Config, ConsumeError, EventFilter,
    ResolvedSeverity, Severity, SpanEventToLogConnector,
};
use rstest::rstest;

const TRACE_ID: [u8; 16] = [
    0x4b, 0xf9, 0x2f, 0x35, 0x77, 0xb3, 0x4d, 0xa6, 0xa3, 0xce, 0x92, 0x9d, 0x0e, 0x0e, 0x47, 0x36,
];
const SPAN_ID: [u8; 8] = [0x00, 0xf0, 0x67, 0xaa, 0x0b, 0xa9, 0x02, 0xb7];

fn kv(key: &str, value: Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn str_kv(key: &str, value: &str) -> KeyValue {
    kv(key, Value::StringValue(value.to_string()))
}

fn attr<'a>(record: &'a LogRecord, key: &str) -> Option<&'a Value> {
    record
        .attributes
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
        .and_then(|v| v.value.as_ref())
}

fn attr_str<'a>(record: &'a LogRecord, key: &str) -> Option<&'a str> {
    match attr(record, key) {
        Some(Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn body_str(record: &LogRecord) -> Option<&str> {
    match record.body.as_ref().and_then(|body| body.value.as_ref()) {
        Some(Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn event(name: &str, attributes: Vec<KeyValue>) -> Event {
    Event {
        time_unix_nano: 1_700_000_000_000_000_000,
        name: name.to_string(),
        attributes,
        dropped_attributes_count: 0,
    }
}

fn span(name: &str, events: Vec<Event>) -> Span {
    Span {
        trace_id: TRACE_ID.to_vec(),
        span_id: SPAN_ID.to_vec(),
        name: name.to_string(),
        kind: SpanKind::Server as i32,
        attributes: vec![str_kv("http.route", "/checkout")],
        events,
        ..Default::default()
    }
}

fn scope_spans(scope_name: &str, spans: Vec<Span>) -> ScopeSpans {
    ScopeSpans {
        scope: Some(InstrumentationScope {
            name: scope_name.to_string(),
            version: "0.1.0".to_string(),
            ..Default::default()
        }),
        spans,
        schema_url: String::new(),
    }
}

fn resource_spans(service: &str, scope_spans: Vec<ScopeSpans>) -> ResourceSpans {
    ResourceSpans {
        resource: Some(Resource {
            attributes: vec![str_kv("service.name", service)],
            ..Default::default()
        }),
        scope_spans,
        schema_url: String::new(),
    }
}

fn traces(resource_spans: Vec<ResourceSpans>) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest { resource_spans }
}

fn single_event(event: Event) -> ExportTraceServiceRequest {
    traces(vec![resource_spans(
        "checkout",
        vec![scope_spans("payments", vec![span("charge", vec![event])])],
    )])
}

type Connector = SpanEventToLogConnector<InMemoryLogsConsumer>;

fn build(config: Config) -> (Connector, InMemoryLogsConsumer) {
    let consumer = InMemoryLogsConsumer::default();
    let connector = SpanEventToLogConnector::new(config, consumer.clone()).unwrap();
    (connector, consumer)
}

fn only_record(connector: &Connector, event: Event) -> LogRecord {
    let logs = connector.extract_logs(&single_event(event));
    assert_eq!(log_record_count(&logs), 1);
    logs.resource_logs[0].scope_logs[0].log_records[0].clone()
}

#[test]
fn no_qualifying_events_means_no_consumer_call() {
    let (connector, consumer) = build(Config::default());

    let input = traces(vec![resource_spans(
        "checkout",
        vec![scope_spans("payments", vec![span("charge", vec![])])],
    )]);
    let logs = connector.extract_logs(&input);
    assert_eq!(log_record_count(&logs), 0);
    assert!(logs.resource_logs.is_empty());

    connector.consume_traces(&input).unwrap();
    connector.consume_traces(&traces(vec![])).unwrap();
    assert!(consumer.get_consumed_logs().unwrap().is_empty());
}

#[test]
fn unmatched_allow_list_never_invokes_consumer() {
    let (connector, consumer) = build(Config {
        include_event_names: vec!["nonexistent".to_string()],
        ..Default::default()
    });

    let input = traces(vec![resource_spans(
        "checkout",
        vec![scope_spans(
            "payments",
            vec![span(
                "charge",
                vec![event("exception", vec![]), event("retry", vec![])],
            )],
        )],
    )]);
    assert_eq!(log_record_count(&connector.extract_logs(&input)), 0);
    connector.consume_traces(&input).unwrap();
    assert!(consumer.get_consumed_logs().unwrap().is_empty());
}

#[test]
fn filter_and_severity_match_extracted_record() {
    let (connector, _) = build(Config {
        include_event_names: vec!["exception".to_string()],
        severity_attribute: "log.severity".to_string(),
        ..Default::default()
    });

    let filter: &EventFilter = connector.event_filter();
    assert!(filter.includes("exception"));
    assert!(!filter.includes("retry"));

    let exception = event("exception", vec![str_kv("log.severity", "warn3")]);
    let severity: ResolvedSeverity = connector.resolve_severity(&exception);
    assert_eq!(severity.number, SeverityNumber::Warn3 as i32);
    assert_eq!(severity.text, "warn3");

    let record = only_record(&connector, exception);
    assert_eq!(record.severity_number, severity.number);
    assert_eq!(record.severity_text, severity.text);
}

#[test]
fn exception_with_default_config() {
    let (connector, consumer) = build(Config::default());

    let input = single_event(event(
        "exception",
        vec![str_kv("exception.type", "NullPointerException")],
    ));
    connector.consume_traces(&input).unwrap();

    let batches = consumer.get_consumed_logs().unwrap();
    assert_eq!(batches.len(), 1);
    let resource_logs = &batches[0].resource_logs[0];
    let resource = resource_logs.resource.as_ref().unwrap();
    assert_eq!(
        resource.attributes,
        vec![str_kv("service.name", "checkout")]
    );

    let record = &resource_logs.scope_logs[0].log_records[0];
    assert_eq!(body_str(record), Some("exception"));
    assert_eq!(record.severity_text, "error");
    assert_eq!(record.severity_number, SeverityNumber::Error as i32);
    assert_eq!(record.trace_id, TRACE_ID.to_vec());
    assert_eq!(record.span_id, SPAN_ID.to_vec());
    assert_eq!(record.time_unix_nano, 1_700_000_000_000_000_000);
    assert_eq!(
        attr_str(record, "exception.type"),
        Some("NullPointerException")
    );
    assert_eq!(attr_str(record, "span.name"), Some("charge"));
    assert_eq!(attr_str(record, "span.kind"), Some("Server"));
    // Resource attributes live on the group, not on each record.
    assert_eq!(attr_str(record, "service.name"), None);
    assert_eq!(attr_str(record, "level"), None);
}

#[rstest]
#[case("error", "connection error")]
#[case("ERROR", "CONNECTION ERROR")]
#[case("Error", "Connection Error")]
fn longest_substring_wins(#[case] short_key: &str, #[case] long_key: &str) {
    let (connector, _) = build(Config {
        severity_by_event_name: HashMap::from([
            (short_key.to_string(), "error".to_string()),
            (long_key.to_string(), "fatal".to_string()),
        ]),
        ..Default::default()
    });

    let record = only_record(&connector, event("database connection error", vec![]));
    assert_eq!(record.severity_text, "fatal");
    assert_eq!(record.severity_number, SeverityNumber::Fatal as i32);

    let record = only_record(&connector, event("Parse Error", vec![]));
    assert_eq!(record.severity_text, "error");
}

#[test]
fn attribute_mapping_takes_precedence() {
    let (connector, _) = build(Config {
        severity_attribute: "log.severity".to_string(),
        severity_by_event_name: HashMap::from([("payment".to_string(), "fatal".to_string())]),
        attribute_mappings: AttributeMappings {
            severity_number: "event.severity_number".to_string(),
            ..Default::default()
        },
        ..Default::default()
    });

    let record = only_record(
        &connector,
        event(
            "payment.declined",
            vec![
                kv("event.severity_number", Value::IntValue(13)),
                str_kv("log.severity", "debug"),
            ],
        ),
    );
    assert_eq!(record.severity_number, SeverityNumber::Warn as i32);
    assert_eq!(record.severity_text, "warn");

    // Without the mapped attribute the next stage applies.
    let record = only_record(
        &connector,
        event("payment.declined", vec![str_kv("log.severity", "debug")]),
    );
    assert_eq!(record.severity_text, "debug");

    // And without either, the event name.
    let record = only_record(&connector, event("payment.declined", vec![]));
    assert_eq!(record.severity_text, "fatal");
}

#[test]
fn severity_text_mapping_parses_and_falls_through() {
    let (connector, _) = build(Config {
        severity_by_event_name: HashMap::from([("timeout".to_string(), "warn".to_string())]),
        attribute_mappings: AttributeMappings {
            severity_text: "event.severity".to_string(),
            ..Default::default()
        },
        ..Default::default()
    });

    let record = only_record(
        &connector,
        event("timeout", vec![str_kv("event.severity", "Warning2")]),
    );
    assert_eq!(record.severity_number, SeverityNumber::Warn2 as i32);
    assert_eq!(record.severity_text, "warn2");

    // An unrecognised text leaves the number to later stages.
    let record = only_record(
        &connector,
        event("timeout", vec![str_kv("event.severity", "notice")]),
    );
    assert_eq!(record.severity_number, SeverityNumber::Warn as i32);
    assert_eq!(record.severity_text, "warn");
}

#[test]
fn unresolved_events_default_to_info() {
    let (connector, _) = build(Config {
        severity_by_event_name: HashMap::new(),
        ..Default::default()
    });
    let record = only_record(&connector, event("cache.miss", vec![]));
    assert_eq!(record.severity_number, SeverityNumber::Info as i32);
    assert_eq!(record.severity_text, "info");
}

#[test]
fn existing_level_is_preserved() {
    let (connector, _) = build(Config {
        add_level: true,
        ..Default::default()
    });

    let record = only_record(
        &connector,
        event("exception", vec![str_kv("level", "critical")]),
    );
    assert_eq!(record.severity_text, "error");
    assert_eq!(attr_str(&record, "level"), Some("critical"));

    let record = only_record(&connector, event("exception", vec![]));
    assert_eq!(attr_str(&record, "level"), Some("error"));
}

#[test]
fn shared_resource_and_scope_form_one_group() {
    let (connector, _) = build(Config::default());

    let input = traces(vec![resource_spans(
        "checkout",
        vec![scope_spans(
            "payments",
            vec![
                span("first", vec![event("exception", vec![])]),
                span("second", vec![event("retry", vec![])]),
            ],
        )],
    )]);
    let logs = connector.extract_logs(&input);

    assert_eq!(logs.resource_logs.len(), 1);
    assert_eq!(logs.resource_logs[0].scope_logs.len(), 1);
    let scope_logs = &logs.resource_logs[0].scope_logs[0];
    assert_eq!(scope_logs.scope.as_ref().unwrap().name, "payments");
    let records = &scope_logs.log_records;
    assert_eq!(records.len(), 2);
    assert_eq!(body_str(&records[0]), Some("exception"));
    assert_eq!(body_str(&records[1]), Some("retry"));
    assert_eq!(attr_str(&records[0], "span.name"), Some("first"));
    assert_eq!(attr_str(&records[1], "span.name"), Some("second"));
}

#[test]
fn identical_resources_stay_separate_groups() {
    let (connector, _) = build(Config::default());

    let scope = || {
        vec![scope_spans(
            "payments",
            vec![span("charge", vec![event("exception", vec![])])],
        )]
    };
    let input = traces(vec![
        resource_spans("checkout", scope()),
        resource_spans("checkout", scope()),
    ]);
    let logs = connector.extract_logs(&input);
    assert_eq!(logs.resource_logs.len(), 2);
    assert_eq!(logs.resource_logs[0], logs.resource_logs[1]);
}

#[test]
fn groups_are_created_lazily() {
    let (connector, _) = build(Config {
        include_event_names: vec!["exception".to_string()],
        ..Default::default()
    });

    let input = traces(vec![
        resource_spans(
            "frontend",
            vec![scope_spans(
                "http",
                vec![span("get", vec![event("retry", vec![])])],
            )],
        ),
        resource_spans(
            "checkout",
            vec![
                scope_spans("db", vec![span("query", vec![event("retry", vec![])])]),
                scope_spans(
                    "payments",
                    vec![span("charge", vec![event("exception", vec![])])],
                ),
            ],
        ),
    ]);
    let logs = connector.extract_logs(&input);

    assert_eq!(logs.resource_logs.len(), 1);
    let resource_logs = &logs.resource_logs[0];
    assert_eq!(
        resource_logs.resource.as_ref().unwrap().attributes,
        vec![str_kv("service.name", "checkout")]
    );
    assert_eq!(resource_logs.scope_logs.len(), 1);
    assert_eq!(
        resource_logs.scope_logs[0].scope.as_ref().unwrap().name,
        "payments"
    );
}

#[test]
fn resource_attributes_left_out_when_not_configured() {
    let (connector, _) = build(Config {
        log_attributes_from: vec![AttributeSource::EventAttributes],
        ..Default::default()
    });
    let logs = connector.extract_logs(&single_event(event("exception", vec![])));
    let resource = logs.resource_logs[0].resource.as_ref().unwrap();
    assert!(resource.attributes.is_empty());
}

#[test]
fn attributes_merge_last_write_wins() {
    let (connector, _) = build(Config {
        log_attributes_from: vec![
            AttributeSource::EventAttributes,
            AttributeSource::SpanAttributes,
        ],
        include_span_context: false,
        ..Default::default()
    });
    let record = only_record(
        &connector,
        event(
            "exception",
            vec![
                str_kv("http.route", "/from-event"),
                str_kv("exception.type", "Timeout"),
            ],
        ),
    );
    assert_eq!(attr_str(&record, "http.route"), Some("/checkout"));
    assert_eq!(attr_str(&record, "exception.type"), Some("Timeout"));
    assert!(record.trace_id.is_empty());
    assert!(record.span_id.is_empty());
    assert_eq!(attr_str(&record, "span.name"), None);
}

#[test]
fn body_and_event_name_mappings() {
    let (connector, _) = build(Config {
        attribute_mappings: AttributeMappings {
            body: "message".to_string(),
            event_name: "event.name".to_string(),
            ..Default::default()
        },
        ..Default::default()
    });

    let record = only_record(
        &connector,
        event("exception", vec![str_kv("message", "card declined")]),
    );
    assert_eq!(body_str(&record), Some("card declined"));
    assert_eq!(attr_str(&record, "event.name"), Some("exception"));

    // A non-string body attribute is ignored.
    let record = only_record(
        &connector,
        event("exception", vec![kv("message", Value::IntValue(7))]),
    );
    assert_eq!(body_str(&record), Some("exception"));
}

#[test]
fn trace_state_only_when_present() {
    let (connector, _) = build(Config::default());
    let mut input = single_event(event("exception", vec![]));
    let logs = connector.extract_logs(&input);
    let record = &logs.resource_logs[0].scope_logs[0].log_records[0];
    assert_eq!(attr_str(record, "trace.state"), None);

    input.resource_spans[0].scope_spans[0].spans[0].trace_state = "vendor=value".to_string();
    let logs = connector.extract_logs(&input);
    let record = &logs.resource_logs[0].scope_logs[0].log_records[0];
    assert_eq!(attr_str(record, "trace.state"), Some("vendor=value"));
}

#[test]
fn consumer_error_is_returned_verbatim() {
    let consumer = InMemoryLogsConsumerBuilder::new()
        .with_failure("queue full")
        .build();
    let connector = SpanEventToLogConnector::new(Config::default(), consumer.clone()).unwrap();

    let err = connector
        .consume_traces(&single_event(event("exception", vec![])))
        .unwrap_err();
    assert!(matches!(err, ConsumeError::InternalFailure(ref msg) if msg == "queue full"));
    assert_eq!(consumer.get_consumed_logs().unwrap().len(), 1);
}

#[test]
fn whole_batch_is_delivered_in_one_call() {
    let (connector, consumer) = build(Config::default());
    let input = traces(vec![
        resource_spans(
            "checkout",
            vec![scope_spans(
                "payments",
                vec![span("charge", vec![event("exception", vec![])])],
            )],
        ),
        resource_spans(
            "frontend",
            vec![scope_spans(
                "http",
                vec![span(
                    "get",
                    vec![event("retry", vec![]), event("retry", vec![])],
                )],
            )],
        ),
    ]);
    connector.consume_traces(&input).unwrap();

    let batches = consumer.get_consumed_logs().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(log_record_count(&batches[0]), 3);
    assert_eq!(consumer.get_consumed_log_records().unwrap().len(), 3);
}

#[test]
fn severity_numbers_round_trip() {
    for number in 1..=24 {
        let severity = Severity::from_number(number).unwrap();
        let reparsed = Severity::parse(severity.text()).unwrap();
        assert_eq!(reparsed.number() as i32, number);
        assert_eq!(reparsed, severity);
    }
}
