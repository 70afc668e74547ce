use crate::cli::AwsCli;
use crate::response::{ListTasksResponse, TaskDefinitionResponse, TasksResponse};
use podbridge_core::ecs::{
    DescribeTasksOutput, RegisteredDefinition, RunTaskRequest, TaskDefinition, TaskHandle,
};
use podbridge_core::{BackendError, TaskService};
use std::collections::HashSet;
use tracing::{debug, info};

/// `TaskService` backed by `aws ecs`.
pub struct AwsCliTaskService {
    cli: AwsCli,
}

impl AwsCliTaskService {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

#[async_trait::async_trait]
impl TaskService for AwsCliTaskService {
    async fn describe_task_definition(
        &self,
        family: &str,
    ) -> Result<Option<RegisteredDefinition>, BackendError> {
        let result: Result<TaskDefinitionResponse, _> = self
            .cli
            .run_json(&[
                "ecs",
                "describe-task-definition",
                "--task-definition",
                family,
                "--include",
                "TAGS",
            ])
            .await;
        match result {
            Ok(response) => Ok(Some(response.into_registered())),
            Err(BackendError::NotFound(_)) => {
                debug!("Task definition family {} not registered yet", family);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredDefinition, BackendError> {
        let response: TaskDefinitionResponse = self
            .cli
            .call("ecs", "register-task-definition", definition)
            .await?;
        let mut registered = response.into_registered();
        // Older CLI versions leave tags out of the register response.
        if registered.tags.is_empty() {
            registered.tags = definition.tags.clone();
        }
        Ok(registered)
    }

    async fn run_task(&self, request: &RunTaskRequest) -> Result<TaskHandle, BackendError> {
        let response: TasksResponse = self.cli.call("ecs", "run-task", request).await?;
        if let Some(failure) = response.failures.first() {
            return Err(BackendError::Rejected(format!(
                "run-task failed: {}",
                failure.describe()
            )));
        }
        let task = response
            .tasks
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("run-task returned no task".into()))?;
        info!("ECS accepted task {}", task.task_arn);
        Ok(TaskHandle(task.task_arn))
    }

    async fn stop_task(
        &self,
        cluster: &str,
        handle: &TaskHandle,
        reason: &str,
    ) -> Result<(), BackendError> {
        self.cli
            .run(&[
                "ecs",
                "stop-task",
                "--cluster",
                cluster,
                "--task",
                &handle.0,
                "--reason",
                reason,
            ])
            .await?;
        Ok(())
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        handles: &[TaskHandle],
    ) -> Result<DescribeTasksOutput, BackendError> {
        if handles.is_empty() {
            return Ok(DescribeTasksOutput::default());
        }
        let mut args = vec!["ecs", "describe-tasks", "--cluster", cluster, "--include", "TAGS", "--tasks"];
        args.extend(handles.iter().map(|h| h.0.as_str()));
        let response: TasksResponse = self.cli.run_json(&args).await?;
        Ok(response.into_output())
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        started_by: &str,
    ) -> Result<Vec<TaskHandle>, BackendError> {
        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        for desired in ["RUNNING", "STOPPED"] {
            let response: ListTasksResponse = self
                .cli
                .run_json(&[
                    "ecs",
                    "list-tasks",
                    "--cluster",
                    cluster,
                    "--started-by",
                    started_by,
                    "--desired-status",
                    desired,
                ])
                .await?;
            for arn in response.task_arns {
                if seen.insert(arn.clone()) {
                    handles.push(TaskHandle(arn));
                }
            }
        }
        Ok(handles)
    }
}
