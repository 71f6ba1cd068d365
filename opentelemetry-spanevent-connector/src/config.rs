//! # Connector configuration
//!
//! Configuration is supplied once, validated once and is read-only afterwards.
//! It can be built in code or loaded from YAML:
//!
//! ```yaml
//! include_event_names: [exception, db.query.slow]
//! include_span_context: true
//! log_attributes_from: [event.attributes, resource.attributes]
//! severity_by_event_name:
//!   exception: error
//!   slow: warn
//! severity_attribute: log.severity
//! add_level: true
//! attribute_mappings:
//!   body: event.body
//!   severity_number: event.severity_number
//!   severity_text: event.severity_text
//!   event_name: event.name
//! ```
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::severity::Severity;

/// A source of attributes copied onto the produced log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeSource {
    /// Attributes of the span event itself.
    EventAttributes,
    /// Attributes of the span carrying the event.
    SpanAttributes,
    /// Attributes of the resource that produced the span.
    ResourceAttributes,
}

impl AttributeSource {
    /// The configuration spelling of this source.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AttributeSource::EventAttributes => "event.attributes",
            AttributeSource::SpanAttributes => "span.attributes",
            AttributeSource::ResourceAttributes => "resource.attributes",
        }
    }
}

impl fmt::Display for AttributeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event.attributes" => Ok(AttributeSource::EventAttributes),
            "span.attributes" => Ok(AttributeSource::SpanAttributes),
            "resource.attributes" => Ok(AttributeSource::ResourceAttributes),
            other => Err(ConfigError::InvalidAttributeSource(other.to_string())),
        }
    }
}

impl TryFrom<String> for AttributeSource {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeSource> for String {
    fn from(source: AttributeSource) -> Self {
        source.as_str().to_string()
    }
}

/// Event attributes that supply log record fields directly.
///
/// Empty strings mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeMappings {
    /// Event attribute whose string value becomes the log body.
    pub body: String,
    /// Event attribute holding an integer severity number.
    pub severity_number: String,
    /// Event attribute holding a severity string.
    pub severity_text: String,
    /// Log attribute key under which the original event name is kept.
    pub event_name: String,
}

impl AttributeMappings {
    /// Returns true when no mapping is configured.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
            && self.severity_number.is_empty()
            && self.severity_text.is_empty()
            && self.event_name.is_empty()
    }
}

/// Configuration of the span event to log connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Exact event names to convert. Empty converts every event.
    pub include_event_names: Vec<String>,

    /// Copy trace id, span id, trace state, span name and span kind onto
    /// each log record.
    pub include_span_context: bool,

    /// Attribute sources merged into the log records, in order.
    pub log_attributes_from: Vec<AttributeSource>,

    /// Case-insensitive event name substring to severity. The longest
    /// matching key wins.
    pub severity_by_event_name: HashMap<String, String>,

    /// Event attribute holding a parseable severity string.
    pub severity_attribute: String,

    /// Mirror the severity text into a `level` attribute unless one is
    /// already present.
    pub add_level: bool,

    /// Direct attribute to field mappings.
    pub attribute_mappings: AttributeMappings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            include_event_names: Vec::new(),
            include_span_context: true,
            log_attributes_from: vec![
                AttributeSource::EventAttributes,
                AttributeSource::ResourceAttributes,
            ],
            severity_by_event_name: HashMap::from([("exception".to_string(), "error".to_string())]),
            severity_attribute: String::new(),
            add_level: false,
            attribute_mappings: AttributeMappings::default(),
        }
    }
}

impl Config {
    /// Parses and validates a configuration from a YAML string.
    ///
    /// Fields absent from the document keep their [`Default`] values. An
    /// empty or null document (`~`, `null`) loads the defaults.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, ConfigError> {
        // Neither an empty nor a null document deserializes to a mapping.
        let config = if yaml_str.trim().is_empty() {
            Config::default()
        } else {
            let parsed: Option<Config> = serde_yaml::from_str(yaml_str)?;
            parsed.unwrap_or_default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration from a YAML file.
    pub fn from_yaml_file(file_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml_str = std::fs::read_to_string(file_path)?;
        Self::from_yaml(&yaml_str)
    }

    /// Checks every configured severity string.
    ///
    /// Attribute sources are already typed; unknown sources are rejected when
    /// parsed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = self.severity_by_event_name.iter().collect();
        // Report the same offending entry regardless of map iteration order.
        entries.sort();
        for (event_name, severity) in entries {
            if Severity::parse(severity).is_none() {
                return Err(ConfigError::InvalidSeverity {
                    event_name: event_name.clone(),
                    severity: severity.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns true when attributes from `source` are merged into records.
    pub fn copies_from(&self, source: AttributeSource) -> bool {
        self.log_attributes_from.contains(&source)
    }
}
