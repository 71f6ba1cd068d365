//! Converts the span events of an OTLP/JSON trace file into OTLP/JSON logs.
//!
//! ```text
//! cargo run -p opentelemetry-spanevent-connector --features with-serde \
//!     --example convert_json -- examples/data/trace.json [config.yaml]
//! ```
use std::sync::atomic::{AtomicUsize, Ordering};

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_spanevent_connector::{
    Config, ConsumeError, ConsumeResult, LogsConsumer, SpanEventToLogConnector,
};

/// Prints every batch it receives as pretty JSON.
#[derive(Debug, Default)]
struct JsonStdoutConsumer {
    batches: AtomicUsize,
}

impl LogsConsumer for JsonStdoutConsumer {
    fn consume_logs(&self, logs: ExportLogsServiceRequest) -> ConsumeResult {
        match serde_json::to_string_pretty(&logs) {
            Ok(json) => println!("{json}"),
            Err(e) => return Err(ConsumeError::Other(e.into())),
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let trace_path = args
        .next()
        .ok_or("usage: convert_json <trace.json> [config.yaml]")?;
    let config = match args.next() {
        Some(config_path) => Config::from_yaml_file(config_path)?,
        None => Config {
            add_level: true,
            ..Default::default()
        },
    };

    let json = std::fs::read_to_string(trace_path)?;
    let traces: ExportTraceServiceRequest = serde_json::from_str(&json)?;

    let connector = SpanEventToLogConnector::new(config, JsonStdoutConsumer::default())?;
    connector.start()?;
    connector.consume_traces(&traces)?;
    connector.shutdown()?;

    let batches = connector.consumer().batches.load(Ordering::Relaxed);
    if batches == 0 {
        eprintln!("No span event matched the configuration.");
    }
    Ok(())
}
