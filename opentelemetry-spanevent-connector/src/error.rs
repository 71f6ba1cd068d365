//! Errors surfaced by the span event connector.
use thiserror::Error;

/// Errors raised while loading or validating a connector [`Config`].
///
/// All of them are reported before any trace batch is processed.
///
/// [`Config`]: crate::Config
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// An entry of `log_attributes_from` is not one of the supported sources.
    #[error("invalid log attributes source: {0}")]
    InvalidAttributeSource(String),

    /// A value of `severity_by_event_name` is not a recognised severity.
    #[error("invalid severity level for event {event_name}: {severity}")]
    InvalidSeverity {
        /// The event name key the severity was configured for.
        event_name: String,
        /// The rejected severity string.
        severity: String,
    },

    /// The configuration document could not be parsed.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors returned by a [`LogsConsumer`] when handed a batch of logs.
///
/// The connector never retries or swallows these; they reach the caller of
/// [`SpanEventToLogConnector::consume_traces`] unchanged.
///
/// [`LogsConsumer`]: crate::LogsConsumer
/// [`SpanEventToLogConnector::consume_traces`]: crate::SpanEventToLogConnector::consume_traces
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConsumeError {
    /// Consumer encountered an internal failure.
    #[error("Consume failed: {0}")]
    InternalFailure(String),

    /// Any other failure reported by the downstream consumer.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Result returned by [`LogsConsumer::consume_logs`](crate::LogsConsumer::consume_logs).
pub type ConsumeResult = Result<(), ConsumeError>;
