//! # Severity resolution
//!
//! The severity of a log record comes from an ordered chain of strategies.
//! Each strategy either resolves a severity, passes, or (for the attribute
//! mapping) leaves a raw severity text behind as a hint. The first strategy
//! that resolves wins. When none does, the record gets `info`, using the
//! hint as text if there is one.
//!
//! Precedence, highest first:
//!
//! 1. `attribute_mappings.severity_number` / `attribute_mappings.severity_text`
//! 2. `severity_attribute`
//! 3. `severity_by_event_name`, longest matching key
use std::borrow::Cow;
use std::fmt::Debug;

use opentelemetry_proto::tonic::trace::v1::span::Event;

use crate::attributes::{get_int, get_str};
use crate::config::Config;
use crate::severity::{severity_text_for_number, Severity};

/// Severity assigned to a log record.
///
/// `number` is kept raw so that a mapped number outside the defined range is
/// passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSeverity {
    /// OTLP severity number.
    pub number: i32,
    /// Severity text, canonical unless taken verbatim from an event attribute.
    pub text: Cow<'static, str>,
}

impl From<Severity> for ResolvedSeverity {
    fn from(severity: Severity) -> Self {
        ResolvedSeverity {
            number: severity.number() as i32,
            text: Cow::Borrowed(severity.text()),
        }
    }
}

impl Default for ResolvedSeverity {
    fn default() -> Self {
        Severity::INFO.into()
    }
}

/// Outcome of a single resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Resolved(ResolvedSeverity),
    /// Raw severity text that could not be parsed. Used only if no later
    /// strategy resolves.
    TextHint(String),
    Unresolved,
}

/// One stage of the severity precedence chain.
pub(crate) trait SeverityStrategy: Debug + Send + Sync {
    fn resolve(&self, event: &Event) -> Resolution;
}

#[derive(Debug)]
struct AttributeMappingStrategy {
    number_key: Option<String>,
    text_key: Option<String>,
}

impl SeverityStrategy for AttributeMappingStrategy {
    fn resolve(&self, event: &Event) -> Resolution {
        let attributes = &event.attributes;
        let mut resolved: Option<ResolvedSeverity> = None;

        if let Some(key) = &self.number_key {
            // Values that do not fit an i32 cannot be a severity number.
            if let Some(number) = get_int(attributes, key).and_then(|n| i32::try_from(n).ok()) {
                resolved = Some(ResolvedSeverity {
                    number,
                    text: Cow::Borrowed(severity_text_for_number(number)),
                });
            }
        }

        let text_key = self.text_key.as_deref();
        if let Some(raw) = text_key.and_then(|key| get_str(attributes, key)) {
            match resolved.as_mut() {
                Some(severity) => severity.text = Cow::Owned(raw.to_string()),
                None => match Severity::parse(raw) {
                    Some(parsed) => resolved = Some(parsed.into()),
                    None => return Resolution::TextHint(raw.to_string()),
                },
            }
        }

        resolved.map_or(Resolution::Unresolved, Resolution::Resolved)
    }
}

#[derive(Debug)]
struct SeverityAttributeStrategy {
    key: String,
}

impl SeverityStrategy for SeverityAttributeStrategy {
    fn resolve(&self, event: &Event) -> Resolution {
        get_str(&event.attributes, &self.key)
            .and_then(Severity::parse)
            .map_or(Resolution::Unresolved, |severity| {
                Resolution::Resolved(severity.into())
            })
    }
}

#[derive(Debug)]
struct EventNameStrategy {
    /// Lowercased key and its severity, longest key first, ties in
    /// lexicographic key order.
    rules: Vec<(String, Severity)>,
}

impl EventNameStrategy {
    fn new<'a>(entries: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut candidates: Vec<(String, &String, Severity)> = entries
            .into_iter()
            .filter(|(key, _)| !key.is_empty())
            .filter_map(|(key, severity)| {
                Severity::parse(severity).map(|parsed| (key.to_lowercase(), key, parsed))
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.0.len()
                .cmp(&a.0.len())
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(b.1))
        });
        EventNameStrategy {
            rules: candidates
                .into_iter()
                .map(|(key, _, severity)| (key, severity))
                .collect(),
        }
    }
}

impl SeverityStrategy for EventNameStrategy {
    fn resolve(&self, event: &Event) -> Resolution {
        let event_name = event.name.to_lowercase();
        self.rules
            .iter()
            .find(|(key, _)| event_name.contains(key.as_str()))
            .map_or(Resolution::Unresolved, |(_, severity)| {
                Resolution::Resolved((*severity).into())
            })
    }
}

/// Resolves the severity of span events by walking the strategy chain.
#[derive(Debug)]
pub(crate) struct SeverityResolver {
    strategies: Vec<Box<dyn SeverityStrategy>>,
}

impl SeverityResolver {
    /// Builds the chain for `config`, skipping stages that are not configured.
    pub(crate) fn new(config: &Config) -> Self {
        let mut strategies: Vec<Box<dyn SeverityStrategy>> = Vec::new();

        let mappings = &config.attribute_mappings;
        if !mappings.severity_number.is_empty() || !mappings.severity_text.is_empty() {
            let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
            strategies.push(Box::new(AttributeMappingStrategy {
                number_key: non_empty(&mappings.severity_number),
                text_key: non_empty(&mappings.severity_text),
            }));
        }

        if !config.severity_attribute.is_empty() {
            strategies.push(Box::new(SeverityAttributeStrategy {
                key: config.severity_attribute.clone(),
            }));
        }

        if !config.severity_by_event_name.is_empty() {
            strategies.push(Box::new(EventNameStrategy::new(
                &config.severity_by_event_name,
            )));
        }

        SeverityResolver { strategies }
    }

    pub(crate) fn stage_count(&self) -> usize {
        self.strategies.len()
    }

    /// Severity for `event`. Never fails; falls back to `info`.
    pub(crate) fn resolve(&self, event: &Event) -> ResolvedSeverity {
        let mut text_hint: Option<String> = None;
        for strategy in &self.strategies {
            match strategy.resolve(event) {
                Resolution::Resolved(severity) => return severity,
                Resolution::TextHint(text) => {
                    text_hint.get_or_insert(text);
                }
                Resolution::Unresolved => {}
            }
        }

        let mut severity = ResolvedSeverity::default();
        if let Some(text) = text_hint {
            severity.text = Cow::Owned(text);
        }
        severity
    }
}
