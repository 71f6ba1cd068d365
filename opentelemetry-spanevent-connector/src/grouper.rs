use std::collections::HashMap;

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans};

/// Identity of a source resource within one input batch.
///
/// Two structurally identical resources with different ids form two groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ResourceId(pub(crate) usize);

/// Identity of a source scope within its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(pub(crate) usize);

#[derive(Debug)]
struct ResourceGroup {
    resource_logs: ResourceLogs,
    scopes: HashMap<ScopeId, usize>,
}

/// Groups converted log records by source resource and scope identity.
///
/// Groups are created on the first record pushed for them, so a resource or
/// scope without a converted event never shows up in the output. Resource
/// attributes are copied at that moment only.
#[derive(Debug)]
pub(crate) struct LogsBatchBuilder {
    copy_resource_attributes: bool,
    groups: Vec<ResourceGroup>,
    resources: HashMap<ResourceId, usize>,
    record_count: usize,
}

impl LogsBatchBuilder {
    pub(crate) fn new(copy_resource_attributes: bool) -> Self {
        LogsBatchBuilder {
            copy_resource_attributes,
            groups: Vec::new(),
            resources: HashMap::new(),
            record_count: 0,
        }
    }

    /// Appends `record` to the group of (`resource_id`, `scope_id`), creating
    /// the resource and scope groups on first sight.
    pub(crate) fn push(
        &mut self,
        resource_id: ResourceId,
        resource_spans: &ResourceSpans,
        scope_id: ScopeId,
        scope_spans: &ScopeSpans,
        record: LogRecord,
    ) {
        let group_index = match self.resources.get(&resource_id) {
            Some(index) => *index,
            None => {
                let index = self.groups.len();
                self.groups.push(ResourceGroup {
                    resource_logs: self.new_resource_logs(resource_spans),
                    scopes: HashMap::new(),
                });
                self.resources.insert(resource_id, index);
                index
            }
        };
        let group = &mut self.groups[group_index];

        let scope_index = match group.scopes.get(&scope_id) {
            Some(index) => *index,
            None => {
                let index = group.resource_logs.scope_logs.len();
                group.resource_logs.scope_logs.push(ScopeLogs {
                    scope: scope_spans.scope.clone(),
                    log_records: Vec::new(),
                    schema_url: scope_spans.schema_url.clone(),
                });
                group.scopes.insert(scope_id, index);
                index
            }
        };

        group.resource_logs.scope_logs[scope_index]
            .log_records
            .push(record);
        self.record_count += 1;
    }

    fn new_resource_logs(&self, resource_spans: &ResourceSpans) -> ResourceLogs {
        let resource = if self.copy_resource_attributes {
            resource_spans.resource.clone().unwrap_or_default()
        } else {
            Resource::default()
        };
        ResourceLogs {
            resource: Some(resource),
            scope_logs: Vec::new(),
            schema_url: resource_spans.schema_url.clone(),
        }
    }

    pub(crate) fn record_count(&self) -> usize {
        self.record_count
    }

    pub(crate) fn finish(self) -> ExportLogsServiceRequest {
        ExportLogsServiceRequest {
            resource_logs: self
                .groups
                .into_iter()
                .map(|group| group.resource_logs)
                .collect(),
        }
    }
}
