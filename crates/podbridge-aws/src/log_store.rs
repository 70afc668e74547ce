use crate::cli::AwsCli;
use crate::response::LogEventsResponse;
use podbridge_core::ecs::LogEvent;
use podbridge_core::{BackendError, LogStore};
use tracing::debug;

/// `LogStore` backed by `aws logs get-log-events`.
pub struct AwsCliLogStore {
    cli: AwsCli,
}

impl AwsCliLogStore {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

#[async_trait::async_trait]
impl LogStore for AwsCliLogStore {
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
    ) -> Result<Option<Vec<LogEvent>>, BackendError> {
        let limit = limit.to_string();
        let result: Result<LogEventsResponse, _> = self
            .cli
            .run_json(&[
                "logs",
                "get-log-events",
                "--log-group-name",
                group,
                "--log-stream-name",
                stream,
                "--limit",
                &limit,
                "--no-start-from-head",
            ])
            .await;
        match result {
            Ok(response) => Ok(Some(response.into_events())),
            Err(BackendError::NotFound(msg)) if msg.contains("log stream") => {
                debug!("Log stream {} not created yet", stream);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
