use crate::mapping::IdentityMapping;
use crate::throttle::ApiThrottle;
use crate::translator::log_stream_name;
use podbridge_core::ecs::LogEvent;
use podbridge_core::pod::PodKey;
use podbridge_core::{LogStore, ProviderError};
use std::sync::Arc;
use tracing::debug;

/// Most events the log store returns for one request.
pub const MAX_LOG_EVENTS: usize = 10_000;

/// Fetches container output straight from the log store; nothing is cached.
pub struct LogRetriever {
    logs: Arc<dyn LogStore>,
    mapping: Arc<IdentityMapping>,
    log_group: String,
    throttle: ApiThrottle,
}

impl LogRetriever {
    pub fn new(
        logs: Arc<dyn LogStore>,
        mapping: Arc<IdentityMapping>,
        log_group: String,
        throttle: ApiThrottle,
    ) -> Self {
        Self {
            logs,
            mapping,
            log_group,
            throttle,
        }
    }

    /// Last `tail_lines` lines of a container's output (0 = as many as one
    /// request returns). Empty if the container has not logged anything yet.
    pub async fn logs(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        tail_lines: usize,
    ) -> Result<String, ProviderError> {
        let key = PodKey::new(namespace, name);
        let entry = self
            .mapping
            .get(&key)
            .await
            .ok_or_else(|| ProviderError::NotFound(format!("pod {}", key)))?;
        if entry.pod.container(container).is_none() {
            return Err(ProviderError::NotFound(format!(
                "container {} in pod {}",
                container, key
            )));
        }

        let stream = log_stream_name(&entry.family, container, &entry.handle);
        let limit = if tail_lines == 0 {
            MAX_LOG_EVENTS
        } else {
            tail_lines.min(MAX_LOG_EVENTS)
        };
        debug!("Fetching {} log event(s) from {}:{}", limit, self.log_group, stream);

        let events = match self
            .throttle
            .run(self.logs.get_log_events(&self.log_group, &stream, limit))
            .await
        {
            Ok(Some(events)) => events,
            Ok(None) => {
                debug!("Log stream {} does not exist yet", stream);
                return Ok(String::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(render_events(events, limit))
    }
}

/// Join the newest `tail` events in timestamp order, one line each.
pub fn render_events(mut events: Vec<LogEvent>, tail: usize) -> String {
    events.sort_by_key(|e| e.timestamp);
    let skip = events.len().saturating_sub(tail);
    let mut out = String::new();
    for event in events.into_iter().skip(skip) {
        out.push_str(&event.message);
        if !event.message.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
