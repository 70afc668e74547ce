use crate::ecs::{
    DescribeTasksOutput, LogEvent, RegisteredDefinition, RunTaskRequest, TaskDefinition,
    TaskHandle,
};
use crate::error::BackendError;

/// Managed container-execution service: definition registration, launch,
/// stop and describe. Implementations are injected into the provider.
#[async_trait::async_trait]
pub trait TaskService: Send + Sync {
    /// Latest active revision of a family, with its tags. `Ok(None)` when the
    /// family has never been registered.
    async fn describe_task_definition(
        &self,
        family: &str,
    ) -> Result<Option<RegisteredDefinition>, BackendError>;

    /// Register a new revision of the definition's family.
    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredDefinition, BackendError>;

    /// Launch exactly one task and return its handle.
    async fn run_task(&self, request: &RunTaskRequest) -> Result<TaskHandle, BackendError>;

    /// Ask the service to stop a task. Returns once the request is accepted.
    async fn stop_task(
        &self,
        cluster: &str,
        handle: &TaskHandle,
        reason: &str,
    ) -> Result<(), BackendError>;

    /// Describe up to 100 tasks in one call. Unknown handles come back as
    /// failures rather than errors.
    async fn describe_tasks(
        &self,
        cluster: &str,
        handles: &[TaskHandle],
    ) -> Result<DescribeTasksOutput, BackendError>;

    /// Handles of running and recently stopped tasks launched with the given
    /// `startedBy` marker.
    async fn list_tasks(
        &self,
        cluster: &str,
        started_by: &str,
    ) -> Result<Vec<TaskHandle>, BackendError>;
}

/// Log store holding one stream per container per task.
#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    /// The most recent `limit` events of a stream, oldest first.
    /// `Ok(None)` when the stream does not exist yet.
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
    ) -> Result<Option<Vec<LogEvent>>, BackendError>;
}
