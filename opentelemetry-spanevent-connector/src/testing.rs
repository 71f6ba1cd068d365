//! Test doubles for the downstream logs consumer.
use std::sync::{Arc, Mutex};

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::logs::v1::LogRecord;

use crate::connector::LogsConsumer;
use crate::error::{ConsumeError, ConsumeResult};

/// A logs consumer that keeps every batch it receives in memory.
///
/// Clones share the same storage, so a clone can be handed to the connector
/// while the original is used for assertions.
///
/// # Example
/// ```no_run
///# use opentelemetry_spanevent_connector::{Config, SpanEventToLogConnector};
///# use opentelemetry_spanevent_connector::testing::InMemoryLogsConsumer;
///# use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
///    let consumer = InMemoryLogsConsumer::default();
///    let connector = SpanEventToLogConnector::new(Config::default(), consumer.clone()).unwrap();
///    connector.consume_traces(&ExportTraceServiceRequest::default()).unwrap();
///    for batch in consumer.get_consumed_logs().unwrap() {
///        println!("{:?}", batch);
///    }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryLogsConsumer {
    batches: Arc<Mutex<Vec<ExportLogsServiceRequest>>>,
    failure: Option<String>,
}

impl Default for InMemoryLogsConsumer {
    fn default() -> Self {
        InMemoryLogsConsumerBuilder::new().build()
    }
}

/// Builder for [`InMemoryLogsConsumer`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogsConsumerBuilder {
    failure: Option<String>,
}

impl InMemoryLogsConsumerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `consume_logs` call fail with this message.
    ///
    /// Batches are still recorded before the error is returned.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Creates the consumer.
    pub fn build(&self) -> InMemoryLogsConsumer {
        InMemoryLogsConsumer {
            batches: Arc::new(Mutex::new(Vec::new())),
            failure: self.failure.clone(),
        }
    }
}

impl InMemoryLogsConsumer {
    /// Returns every batch received so far, in arrival order.
    pub fn get_consumed_logs(&self) -> Result<Vec<ExportLogsServiceRequest>, ConsumeError> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .map_err(|e| ConsumeError::InternalFailure(format!("Failed to lock logs: {}", e)))
    }

    /// Returns every received log record, flattened across batches and groups.
    pub fn get_consumed_log_records(&self) -> Result<Vec<LogRecord>, ConsumeError> {
        Ok(self
            .get_consumed_logs()?
            .into_iter()
            .flat_map(|batch| batch.resource_logs)
            .flat_map(|resource_logs| resource_logs.scope_logs)
            .flat_map(|scope_logs| scope_logs.log_records)
            .collect())
    }

    /// Drops every recorded batch.
    pub fn reset(&self) {
        let _ = self.batches.lock().map(|mut batches| batches.clear());
    }
}

impl LogsConsumer for InMemoryLogsConsumer {
    fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult {
        self.batches
            .lock()
            .map(|mut batches| batches.push(logs))
            .map_err(|e| ConsumeError::InternalFailure(format!("Failed to lock logs: {}", e)))?;
        match &self.failure {
            Some(message) => Err(ConsumeError::InternalFailure(message.clone())),
            None => Ok(()),
        }
    }
}
