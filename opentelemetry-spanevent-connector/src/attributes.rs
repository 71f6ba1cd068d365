//! Attribute helpers and the composition of log record bodies and attributes.
use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::span::{Event, SpanKind};
use opentelemetry_proto::tonic::trace::v1::Span;

use crate::config::{AttributeSource, Config};

/// Attribute holding the mirrored severity text.
pub const LEVEL_KEY: &str = "level";
/// Attribute holding the span's W3C trace state, when not empty.
pub const TRACE_STATE_KEY: &str = "trace.state";
/// Attribute holding the name of the span that carried the event.
pub const SPAN_NAME_KEY: &str = "span.name";
/// Attribute holding the kind of the span that carried the event.
pub const SPAN_KIND_KEY: &str = "span.kind";

/// Wrapper type for Vec<[`KeyValue`]> with map-like, last-write-wins inserts.
///
/// Insertion order is kept; overwriting a key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Attributes(pub(crate) Vec<KeyValue>);

impl Attributes {
    /// Inserts or replaces the value stored under `key`.
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Option<AnyValue>) {
        let key = key.into();
        match self.0.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.0.push(KeyValue { key, value }),
        }
    }

    /// Inserts or replaces a string value.
    pub(crate) fn insert_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, Some(string_value(value)));
    }

    /// Copies every key/value of `kvs`, overwriting keys already present.
    pub(crate) fn extend_from(&mut self, kvs: &[KeyValue]) {
        for kv in kvs {
            self.insert(kv.key.clone(), kv.value.clone());
        }
    }

    /// Returns the value stored under `key`.
    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&AnyValue> {
        find(&self.0, key).and_then(|kv| kv.value.as_ref())
    }

    /// Returns true if `key` is present, whatever its value.
    pub(crate) fn contains_key(&self, key: &str) -> bool {
        find(&self.0, key).is_some()
    }
}

impl From<Attributes> for Vec<KeyValue> {
    fn from(attributes: Attributes) -> Self {
        attributes.0
    }
}

fn find<'a>(kvs: &'a [KeyValue], key: &str) -> Option<&'a KeyValue> {
    kvs.iter().find(|kv| kv.key == key)
}

fn find_value<'a>(kvs: &'a [KeyValue], key: &str) -> Option<&'a Value> {
    find(kvs, key)
        .and_then(|kv| kv.value.as_ref())
        .and_then(|any| any.value.as_ref())
}

/// Returns the string value stored under `key`, if that is its type.
pub(crate) fn get_str<'a>(kvs: &'a [KeyValue], key: &str) -> Option<&'a str> {
    match find_value(kvs, key) {
        Some(Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Returns the integer value stored under `key`, if that is its type.
pub(crate) fn get_int(kvs: &[KeyValue], key: &str) -> Option<i64> {
    match find_value(kvs, key) {
        Some(Value::IntValue(i)) => Some(*i),
        _ => None,
    }
}

pub(crate) fn string_value(value: impl Into<String>) -> AnyValue {
    AnyValue {
        value: Some(Value::StringValue(value.into())),
    }
}

/// Canonical name of a span kind, `Unspecified` for unknown values.
pub fn span_kind_name(kind: i32) -> &'static str {
    match SpanKind::try_from(kind) {
        Ok(SpanKind::Internal) => "Internal",
        Ok(SpanKind::Server) => "Server",
        Ok(SpanKind::Client) => "Client",
        Ok(SpanKind::Producer) => "Producer",
        Ok(SpanKind::Consumer) => "Consumer",
        Ok(SpanKind::Unspecified) | Err(_) => "Unspecified",
    }
}

/// Fills the body and attributes of a log record from its event and span.
///
/// Resource attributes are not handled here: they belong to the resource
/// group and are copied once when the group is created.
#[derive(Debug, Clone)]
pub(crate) struct AttributeComposer {
    record_sources: Vec<AttributeSource>,
    body_key: Option<String>,
    event_name_key: Option<String>,
    add_level: bool,
    include_span_context: bool,
}

impl AttributeComposer {
    pub(crate) fn new(config: &Config) -> Self {
        let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
        AttributeComposer {
            record_sources: config
                .log_attributes_from
                .iter()
                .copied()
                .filter(|source| *source != AttributeSource::ResourceAttributes)
                .collect(),
            body_key: non_empty(&config.attribute_mappings.body),
            event_name_key: non_empty(&config.attribute_mappings.event_name),
            add_level: config.add_level,
            include_span_context: config.include_span_context,
        }
    }

    /// Log body: the mapped body attribute when it holds a string, the event
    /// name otherwise.
    pub(crate) fn body(&self, event: &Event) -> AnyValue {
        let mapped = self
            .body_key
            .as_deref()
            .and_then(|key| get_str(&event.attributes, key));
        string_value(mapped.unwrap_or(&event.name))
    }

    /// Sets body, attributes and span context on `record`.
    ///
    /// Expects the severity fields of `record` to be resolved already, since
    /// the `level` attribute mirrors them.
    pub(crate) fn compose(&self, record: &mut LogRecord, event: &Event, span: &Span) {
        record.body = Some(self.body(event));

        let mut attributes = Attributes(Vec::with_capacity(event.attributes.len()));
        for source in &self.record_sources {
            match source {
                AttributeSource::EventAttributes => attributes.extend_from(&event.attributes),
                AttributeSource::SpanAttributes => attributes.extend_from(&span.attributes),
                AttributeSource::ResourceAttributes => {}
            }
        }

        if let Some(key) = &self.event_name_key {
            attributes.insert_str(key.as_str(), event.name.as_str());
        }

        // An existing level, usually from the event itself, is never replaced.
        if self.add_level && !attributes.contains_key(LEVEL_KEY) {
            attributes.insert_str(LEVEL_KEY, record.severity_text.as_str());
        }

        if self.include_span_context {
            record.trace_id = span.trace_id.clone();
            record.span_id = span.span_id.clone();
            record.flags = span.flags & 0xff;
            if !span.trace_state.is_empty() {
                attributes.insert_str(TRACE_STATE_KEY, span.trace_state.as_str());
            }
            attributes.insert_str(SPAN_NAME_KEY, span.name.as_str());
            attributes.insert_str(SPAN_KIND_KEY, span_kind_name(span.kind));
        }

        record.attributes = attributes.into();
    }
}
