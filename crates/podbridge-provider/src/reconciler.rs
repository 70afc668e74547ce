use crate::mapping::{IdentityMapping, TrackedTask};
use crate::throttle::ApiThrottle;
use podbridge_core::ecs::{
    TaskDescription, TaskHandle, TaskState, STOP_CODE_FAILED_TO_START,
};
use podbridge_core::pod::{ContainerState, ContainerStatus, Phase, Pod, PodKey, PodStatus};
use podbridge_core::{ProviderError, TaskService};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest number of handles the task service accepts per describe call.
pub const DESCRIBE_BATCH_SIZE: usize = 100;

/// What one describe round said about a handle.
#[derive(Debug, Clone)]
pub enum Described {
    Found(Box<TaskDescription>),
    Missing,
    Failed(String),
}

/// Describe `handles` in batches, one throttled call per batch.
pub async fn describe_batched(
    tasks: &dyn TaskService,
    throttle: &ApiThrottle,
    cluster: &str,
    handles: &[TaskHandle],
) -> Result<HashMap<TaskHandle, Described>, ProviderError> {
    let mut described = HashMap::with_capacity(handles.len());
    for batch in handles.chunks(DESCRIBE_BATCH_SIZE) {
        debug!("Describing {} task(s) in {}", batch.len(), cluster);
        let output = throttle.run(tasks.describe_tasks(cluster, batch)).await?;
        for task in output.tasks {
            described.insert(task.handle.clone(), Described::Found(Box::new(task)));
        }
        for failure in output.failures {
            let outcome = if failure.is_missing() {
                Described::Missing
            } else {
                Described::Failed(failure.reason)
            };
            described.insert(TaskHandle(failure.arn), outcome);
        }
    }
    // The service answers every handle; one it skipped is treated as gone.
    for handle in handles {
        described
            .entry(handle.clone())
            .or_insert(Described::Missing);
    }
    Ok(described)
}

/// Phase for one described task, highest-precedence rule first.
pub fn derive_phase(task: &TaskDescription) -> Phase {
    let containers = &task.containers;

    let container_failed = containers
        .iter()
        .any(|c| matches!(c.exit_code, Some(code) if code != 0));
    if container_failed || task.stop_code.as_deref() == Some(STOP_CODE_FAILED_TO_START) {
        return Phase::Failed;
    }

    if !containers.is_empty()
        && containers
            .iter()
            .all(|c| c.last_status.is_stopped() && c.exit_code == Some(0))
    {
        return Phase::Succeeded;
    }

    if !containers.is_empty() && containers.iter().all(|c| c.last_status == TaskState::Running) {
        return Phase::Running;
    }

    if task.last_status.is_stopped() {
        // Stopped without a usable exit code: no way to call it a success.
        warn!(
            "Task {} stopped without a clear outcome ({}); reporting Failed",
            task.handle,
            task.stopped_reason.as_deref().unwrap_or("no reason given")
        );
        return Phase::Failed;
    }

    if task.last_status == TaskState::Unknown {
        return Phase::Unknown;
    }

    Phase::Pending
}

/// Never report a phase that is earlier in the lifecycle than one already
/// reported; terminal phases stick.
pub fn settle_phase(last: Option<Phase>, observed: Phase) -> Phase {
    match (last, observed) {
        (Some(last), _) if last.is_terminal() => last,
        (Some(last), Phase::Unknown) => last,
        (Some(last), observed) if observed.rank() < last.rank() => last,
        (_, observed) => observed,
    }
}

fn container_status(task: &TaskDescription, index: usize) -> ContainerStatus {
    let container = &task.containers[index];
    let state = match container.last_status {
        TaskState::Running => ContainerState::Running {
            started_at: task.started_at,
        },
        TaskState::Stopped => ContainerState::Terminated {
            exit_code: container.exit_code,
            reason: container.reason.clone(),
            finished_at: task.stopped_at,
        },
        other => ContainerState::Waiting {
            reason: Some(other.to_string()),
        },
    };
    ContainerStatus {
        name: container.name.clone(),
        image: container.image.clone(),
        ready: container.last_status == TaskState::Running,
        restart_count: 0,
        state,
    }
}

/// Front-end status for a described task, reported with `phase`.
pub fn build_status(task: &TaskDescription, phase: Phase) -> PodStatus {
    let (reason, message) = if phase.is_terminal() {
        (task.stop_code.clone(), task.stopped_reason.clone())
    } else {
        (None, None)
    };
    PodStatus {
        phase,
        reason,
        message,
        pod_ip: task.private_ip.clone(),
        start_time: task.started_at,
        container_statuses: (0..task.containers.len())
            .map(|i| container_status(task, i))
            .collect(),
    }
}

/// Polls the task service and derives pod status. Pull-only: nothing runs
/// between calls.
pub struct StatusReconciler {
    tasks: Arc<dyn TaskService>,
    mapping: Arc<IdentityMapping>,
    cluster: String,
    throttle: ApiThrottle,
}

impl StatusReconciler {
    pub fn new(
        tasks: Arc<dyn TaskService>,
        mapping: Arc<IdentityMapping>,
        cluster: String,
        throttle: ApiThrottle,
    ) -> Self {
        Self {
            tasks,
            mapping,
            cluster,
            throttle,
        }
    }

    /// Pod and status for one key; `None` if untracked or gone.
    pub async fn pod(&self, key: &PodKey) -> Result<Option<(Pod, PodStatus)>, ProviderError> {
        let Some(entry) = self.mapping.get(key).await else {
            return Ok(None);
        };
        let mut reports = self.reconcile(vec![(key.clone(), entry)]).await?;
        Ok(reports.pop())
    }

    pub async fn status(&self, key: &PodKey) -> Result<Option<PodStatus>, ProviderError> {
        Ok(self.pod(key).await?.map(|(_, status)| status))
    }

    /// Every tracked pod, described in as few calls as the batch size allows.
    pub async fn status_all(&self) -> Result<Vec<(Pod, PodStatus)>, ProviderError> {
        let entries = self.mapping.snapshot().await;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        self.reconcile(entries).await
    }

    async fn reconcile(
        &self,
        entries: Vec<(PodKey, TrackedTask)>,
    ) -> Result<Vec<(Pod, PodStatus)>, ProviderError> {
        let handles: Vec<TaskHandle> = entries.iter().map(|(_, t)| t.handle.clone()).collect();
        let described =
            describe_batched(self.tasks.as_ref(), &self.throttle, &self.cluster, &handles).await?;

        let mut reports = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match described.get(&entry.handle) {
                Some(Described::Found(task)) => {
                    let observed = derive_phase(task);
                    let settled = self
                        .mapping
                        .update(&key, &entry.handle, |tracked| {
                            let phase = settle_phase(tracked.last_phase, observed);
                            if phase != Phase::Unknown {
                                tracked.last_phase = Some(phase);
                            }
                            (phase, tracked.delete_requested)
                        })
                        .await;
                    // Entry replaced or removed while we were describing.
                    let Some((phase, delete_requested)) = settled else {
                        continue;
                    };
                    if phase.is_terminal() && delete_requested {
                        self.mapping.remove_if_handle(&key, &entry.handle).await;
                        info!("Pod {} finished after delete ({}); no longer tracked", key, phase);
                        continue;
                    }
                    reports.push((entry.pod, build_status(task, phase)));
                }
                Some(Described::Failed(reason)) => {
                    if self
                        .mapping
                        .remove_if_handle(&key, &entry.handle)
                        .await
                        .is_some()
                    {
                        warn!(
                            "Task {} for pod {} cannot be resolved ({}); dropping mapping",
                            entry.handle, key, reason
                        );
                    }
                }
                Some(Described::Missing) | None => {
                    if self
                        .mapping
                        .remove_if_handle(&key, &entry.handle)
                        .await
                        .is_some()
                    {
                        warn!(
                            "Task {} for pod {} no longer exists; dropping mapping",
                            entry.handle, key
                        );
                    }
                }
            }
        }
        Ok(reports)
    }
}
