#![allow(dead_code)]

//! In-memory stand-in for the task service and the log store. Tests drive
//! task and container states by hand and inspect the calls made.

use chrono::Utc;
use podbridge_core::ecs::{
    tag_value, ContainerDescription, DescribeTasksOutput, LogEvent, RegisteredDefinition,
    RunTaskRequest, TaskDefinition, TaskDescription, TaskFailure, TaskHandle, TaskState,
    FAILURE_MISSING, STOP_CODE_FAILED_TO_START,
};
use podbridge_core::pod::{Container, Pod};
use podbridge_core::quantity::{CpuShares, Memory};
use podbridge_core::{BackendError, LogStore, NodeInfo, ProviderConfig, TaskService};
use podbridge_provider::translator::{family_name, log_stream_name, TAG_NAME, TAG_NAMESPACE};
use podbridge_provider::Provider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const CLUSTER: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/vk-aws-e2e-test";
pub const LOG_GROUP: &str = "/ecs/vk-aws-e2e-test";

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub describe_definition: usize,
    pub register: usize,
    pub run: usize,
    pub stop: usize,
    pub describe_batches: Vec<usize>,
    pub list: usize,
    pub log_limits: Vec<usize>,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.describe_definition
            + self.register
            + self.run
            + self.stop
            + self.describe_batches.len()
            + self.list
            + self.log_limits.len()
    }
}

struct FakeTask {
    description: TaskDescription,
    started_by: String,
}

#[derive(Default)]
struct State {
    definitions: HashMap<String, Vec<RegisteredDefinition>>,
    /// Container (name, image) pairs per registered definition ARN.
    definition_containers: HashMap<String, Vec<(String, String)>>,
    tasks: Vec<FakeTask>,
    next_task_id: usize,
    streams: HashMap<String, Vec<LogEvent>>,
    calls: Calls,
    fail_next_run: Option<BackendError>,
    fail_describe: Option<BackendError>,
    /// Handles answered with a per-task failure reason instead of a task.
    unresolvable: HashMap<TaskHandle, String>,
}

#[derive(Default)]
pub struct FakeEcs {
    state: Mutex<State>,
}

impl FakeEcs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn launched(&self) -> usize {
        self.state.lock().unwrap().tasks.len()
    }

    pub fn registrations(&self) -> usize {
        self.state.lock().unwrap().calls.register
    }

    pub fn fail_next_run(&self, err: BackendError) {
        self.state.lock().unwrap().fail_next_run = Some(err);
    }

    pub fn fail_describe(&self, err: Option<BackendError>) {
        self.state.lock().unwrap().fail_describe = err;
    }

    /// Answer every later describe of `handle` with `reason` as a failure.
    pub fn make_unresolvable(&self, handle: &TaskHandle, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .unresolvable
            .insert(handle.clone(), reason.to_string());
    }

    /// Handle of the newest task tagged with the given pod identity.
    pub fn handle_for(&self, namespace: &str, name: &str) -> TaskHandle {
        let state = self.state.lock().unwrap();
        state
            .tasks
            .iter()
            .rev()
            .find(|t| {
                tag_value(&t.description.tags, TAG_NAMESPACE) == Some(namespace)
                    && tag_value(&t.description.tags, TAG_NAME) == Some(name)
            })
            .map(|t| t.description.handle.clone())
            .expect("no task for pod")
    }

    pub fn task(&self, handle: &TaskHandle) -> TaskDescription {
        let state = self.state.lock().unwrap();
        state
            .tasks
            .iter()
            .find(|t| &t.description.handle == handle)
            .map(|t| t.description.clone())
            .expect("unknown task")
    }

    fn with_task(&self, handle: &TaskHandle, f: impl FnOnce(&mut TaskDescription)) {
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| &t.description.handle == handle)
            .expect("unknown task");
        f(&mut task.description);
    }

    pub fn set_pending(&self, handle: &TaskHandle) {
        self.with_task(handle, |t| {
            t.last_status = TaskState::Pending;
            for c in &mut t.containers {
                c.last_status = TaskState::Pending;
            }
        });
    }

    pub fn set_running(&self, handle: &TaskHandle) {
        self.with_task(handle, |t| {
            t.last_status = TaskState::Running;
            t.started_at = Some(Utc::now());
            t.private_ip = Some("10.0.1.17".to_string());
            for c in &mut t.containers {
                c.last_status = TaskState::Running;
            }
        });
    }

    /// Stop the task with one exit code per container.
    pub fn finish(&self, handle: &TaskHandle, exit_codes: &[i32]) {
        self.with_task(handle, |t| {
            t.last_status = TaskState::Stopped;
            t.desired_status = TaskState::Stopped;
            t.stopped_at = Some(Utc::now());
            if t.stop_code.is_none() {
                t.stop_code = Some("EssentialContainerExited".to_string());
            }
            for (c, code) in t.containers.iter_mut().zip(exit_codes) {
                c.last_status = TaskState::Stopped;
                c.exit_code = Some(*code);
            }
        });
    }

    pub fn stop_without_exit_codes(&self, handle: &TaskHandle) {
        self.with_task(handle, |t| {
            t.last_status = TaskState::Stopped;
            t.desired_status = TaskState::Stopped;
            t.stopped_reason = Some("Host EC2 instance terminated".to_string());
            for c in &mut t.containers {
                c.last_status = TaskState::Stopped;
            }
        });
    }

    pub fn fail_to_start(&self, handle: &TaskHandle) {
        self.with_task(handle, |t| {
            t.last_status = TaskState::Stopped;
            t.desired_status = TaskState::Stopped;
            t.stop_code = Some(STOP_CODE_FAILED_TO_START.to_string());
            t.stopped_reason = Some("CannotPullContainerError: image not found".to_string());
            for c in &mut t.containers {
                c.last_status = TaskState::Stopped;
            }
        });
    }

    /// Drop the task entirely, as the service does some time after it stops.
    pub fn forget(&self, handle: &TaskHandle) {
        self.state
            .lock()
            .unwrap()
            .tasks
            .retain(|t| &t.description.handle != handle);
    }

    pub fn push_log(&self, stream: &str, timestamp: i64, message: &str) {
        self.state
            .lock()
            .unwrap()
            .streams
            .entry(stream.to_string())
            .or_default()
            .push(LogEvent {
                timestamp,
                message: message.to_string(),
            });
    }

    /// Stream name the provider will read for a pod's container.
    pub fn stream_for(&self, namespace: &str, name: &str, container: &str) -> String {
        let handle = self.handle_for(namespace, name);
        let family = family_name(&podbridge_core::PodKey::new(namespace, name));
        log_stream_name(&family, container, &handle)
    }
}

#[async_trait::async_trait]
impl TaskService for FakeEcs {
    async fn describe_task_definition(
        &self,
        family: &str,
    ) -> Result<Option<RegisteredDefinition>, BackendError> {
        // Suspend once so concurrent creates are both in flight here.
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.calls.describe_definition += 1;
        Ok(state
            .definitions
            .get(family)
            .and_then(|revisions| revisions.last().cloned()))
    }

    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<RegisteredDefinition, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.register += 1;
        let revisions = state
            .definitions
            .entry(definition.family.clone())
            .or_default();
        let revision = revisions.len() as u32 + 1;
        let registered = RegisteredDefinition {
            arn: format!(
                "arn:aws:ecs:us-east-1:123456789012:task-definition/{}:{}",
                definition.family, revision
            ),
            family: definition.family.clone(),
            revision,
            tags: definition.tags.clone(),
        };
        revisions.push(registered.clone());
        let containers = definition
            .container_definitions
            .iter()
            .map(|c| (c.name.clone(), c.image.clone()))
            .collect();
        state
            .definition_containers
            .insert(registered.arn.clone(), containers);
        Ok(registered)
    }

    async fn run_task(&self, request: &RunTaskRequest) -> Result<TaskHandle, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.run += 1;
        if let Some(err) = state.fail_next_run.take() {
            return Err(err);
        }
        let containers = state
            .definition_containers
            .get(&request.task_definition)
            .ok_or_else(|| {
                BackendError::Rejected(format!("unknown task definition {}", request.task_definition))
            })?
            .iter()
            .map(|(name, image)| ContainerDescription {
                name: name.clone(),
                image: image.clone(),
                last_status: TaskState::Pending,
                exit_code: None,
                reason: None,
            })
            .collect();

        state.next_task_id += 1;
        let id = format!("{:032x}", state.next_task_id);
        let cluster_name = request.cluster.rsplit('/').next().unwrap_or(&request.cluster);
        let handle = TaskHandle(format!(
            "arn:aws:ecs:us-east-1:123456789012:task/{}/{}",
            cluster_name, id
        ));
        state.tasks.push(FakeTask {
            description: TaskDescription {
                handle: handle.clone(),
                task_definition_arn: request.task_definition.clone(),
                last_status: TaskState::Provisioning,
                desired_status: TaskState::Running,
                stop_code: None,
                stopped_reason: None,
                created_at: Some(Utc::now()),
                started_at: None,
                stopped_at: None,
                private_ip: None,
                containers,
                tags: request.tags.clone(),
            },
            started_by: request.started_by.clone(),
        });
        Ok(handle)
    }

    async fn stop_task(
        &self,
        _cluster: &str,
        handle: &TaskHandle,
        reason: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.stop += 1;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| &t.description.handle == handle)
            .ok_or_else(|| BackendError::NotFound(format!("task {}", handle)))?;
        task.description.desired_status = TaskState::Stopped;
        task.description.stopped_reason = Some(reason.to_string());
        task.description.stop_code = Some("UserInitiated".to_string());
        Ok(())
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        handles: &[TaskHandle],
    ) -> Result<DescribeTasksOutput, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.describe_batches.push(handles.len());
        if let Some(err) = state.fail_describe.clone() {
            return Err(err);
        }
        let mut output = DescribeTasksOutput::default();
        for handle in handles {
            if let Some(reason) = state.unresolvable.get(handle) {
                output.failures.push(TaskFailure {
                    arn: handle.0.clone(),
                    reason: reason.clone(),
                });
                continue;
            }
            match state.tasks.iter().find(|t| &t.description.handle == handle) {
                Some(task) => output.tasks.push(task.description.clone()),
                None => output.failures.push(TaskFailure {
                    arn: handle.0.clone(),
                    reason: FAILURE_MISSING.to_string(),
                }),
            }
        }
        Ok(output)
    }

    async fn list_tasks(
        &self,
        _cluster: &str,
        started_by: &str,
    ) -> Result<Vec<TaskHandle>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.list += 1;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.started_by == started_by)
            .map(|t| t.description.handle.clone())
            .collect())
    }
}

#[async_trait::async_trait]
impl LogStore for FakeEcs {
    async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
    ) -> Result<Option<Vec<LogEvent>>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.log_limits.push(limit);
        if group != LOG_GROUP {
            return Err(BackendError::NotFound(format!("log group {}", group)));
        }
        Ok(state.streams.get(stream).map(|events| {
            let skip = events.len().saturating_sub(limit);
            events[skip..].to_vec()
        }))
    }
}

pub fn test_config() -> ProviderConfig {
    ProviderConfig::new(
        "us-east-1",
        CLUSTER,
        LOG_GROUP,
        "vk-aws-e2e-test",
        vec!["subnet-0a1b2c3d".to_string()],
    )
}

pub fn test_node() -> NodeInfo {
    NodeInfo::new("vk-aws-test", "Linux", "1.2.3.4", 10250)
}

pub fn test_provider(fake: &Arc<FakeEcs>) -> Provider {
    Provider::new(test_config(), test_node(), fake.clone(), fake.clone()).unwrap()
}

/// The pod from the end-to-end scenario: prints "Started" and sleeps.
pub fn echo_pod(name: &str) -> Pod {
    let mut container = Container::new("echo-container", "busybox");
    container.command = vec!["/bin/sh".to_string()];
    container.args = vec![
        "-c".to_string(),
        "echo \"Started\"; while true; do sleep 1; done".to_string(),
    ];
    container.resources.limits.cpu = Some(CpuShares::new(200));
    container.resources.limits.memory = Some(Memory::from_mib(450));
    container.resources.requests.cpu = Some(CpuShares::new(100));
    container.resources.requests.memory = Some(Memory::from_mib(256));
    Pod::new("default", name, "unique", vec![container])
}
