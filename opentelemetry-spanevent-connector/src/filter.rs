use std::collections::HashSet;

/// Decides which span events are converted into log records.
///
/// Matching is exact on the full event name. An empty allow-list lets every
/// event through.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    allowed: Option<HashSet<String>>,
}

impl EventFilter {
    /// Builds a filter from the configured allow-list.
    pub fn new<I, S>(include_event_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = include_event_names.into_iter().map(Into::into).collect();
        EventFilter {
            allowed: (!allowed.is_empty()).then_some(allowed),
        }
    }

    /// Returns true when an event with this name should be converted.
    pub fn includes(&self, event_name: &str) -> bool {
        match &self.allowed {
            Some(allowed) => allowed.contains(event_name),
            None => true,
        }
    }
}
