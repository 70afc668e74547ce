use crate::mapping::{IdentityMapping, TrackedTask};
use crate::reconciler::{describe_batched, Described};
use crate::throttle::ApiThrottle;
use crate::translator::{
    self, family_name, TaskPlan, TranslatorContext, TAG_FINGERPRINT, TAG_NAME, TAG_NAMESPACE,
    TAG_UID,
};
use podbridge_core::ecs::{tag_value, RegisteredDefinition, TaskDescription, TaskHandle};
use podbridge_core::pod::{Container, Pod, PodKey};
use podbridge_core::{BackendError, ProviderError, TaskService};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stop reason attached to every task stopped through `delete`. Also how a
/// fresh process recognises tasks that were already deleted.
pub const DELETE_REASON: &str = "Deleted by podbridge";

/// Creates and stops tasks and owns writes to the identity mapping.
pub struct LifecycleManager {
    tasks: Arc<dyn TaskService>,
    mapping: Arc<IdentityMapping>,
    context: TranslatorContext,
    throttle: ApiThrottle,
}

impl LifecycleManager {
    pub fn new(
        tasks: Arc<dyn TaskService>,
        mapping: Arc<IdentityMapping>,
        context: TranslatorContext,
        throttle: ApiThrottle,
    ) -> Self {
        Self {
            tasks,
            mapping,
            context,
            throttle,
        }
    }

    /// Translate, register and launch. The mapping entry is only written
    /// after the launch is accepted.
    pub async fn create(&self, pod: &Pod) -> Result<TaskHandle, ProviderError> {
        let key = pod.key();
        let plan = translator::translate(pod, &self.context)?;

        if !self.mapping.reserve(&key).await {
            return Err(ProviderError::AlreadyExists(key));
        }
        let result = self.create_reserved(pod, &key, plan).await;
        self.mapping.release(&key).await;
        result
    }

    async fn create_reserved(
        &self,
        pod: &Pod,
        key: &PodKey,
        plan: TaskPlan,
    ) -> Result<TaskHandle, ProviderError> {
        if let Some(existing) = self.mapping.get(key).await {
            if self.still_occupies(&existing).await? {
                return Err(ProviderError::AlreadyExists(key.clone()));
            }
            self.mapping.remove_if_handle(key, &existing.handle).await;
        }

        let definition = self.upsert_definition(&plan).await?;

        let mut launch = plan.launch;
        launch.task_definition = definition.arn.clone();
        let handle = match self.tasks.run_task(&launch).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Launch of pod {} failed: {}", key, e);
                return Err(e.into());
            }
        };

        info!(
            "Pod {} launched as task {} ({} rev {})",
            key, handle, definition.family, definition.revision
        );
        self.mapping
            .insert(
                key.clone(),
                TrackedTask::new(pod.clone(), handle.clone(), plan.definition.family),
            )
            .await;
        Ok(handle)
    }

    /// Whether an existing entry still blocks a new create: its task resolves
    /// and was not already stopped on our request.
    async fn still_occupies(&self, existing: &TrackedTask) -> Result<bool, ProviderError> {
        let described = describe_batched(
            self.tasks.as_ref(),
            &self.throttle,
            &self.context.cluster,
            std::slice::from_ref(&existing.handle),
        )
        .await?;
        Ok(match described.get(&existing.handle) {
            Some(Described::Found(task)) => {
                !(existing.delete_requested && task.last_status.is_stopped())
            }
            Some(Described::Failed(reason)) => {
                warn!(
                    "Task {} for pod {} cannot be resolved ({}); dropping mapping",
                    existing.handle,
                    existing.pod.key(),
                    reason
                );
                false
            }
            Some(Described::Missing) | None => {
                warn!(
                    "Task {} for pod {} no longer exists; dropping mapping",
                    existing.handle,
                    existing.pod.key()
                );
                false
            }
        })
    }

    /// Reuse the family's latest revision if it carries the same fingerprint,
    /// otherwise register a new one.
    async fn upsert_definition(&self, plan: &TaskPlan) -> Result<RegisteredDefinition, ProviderError> {
        let family = &plan.definition.family;
        match self.tasks.describe_task_definition(family).await {
            Ok(Some(existing))
                if tag_value(&existing.tags, TAG_FINGERPRINT) == Some(plan.fingerprint.as_str()) =>
            {
                debug!("Reusing task definition {} for identical content", existing.arn);
                return Ok(existing);
            }
            Ok(_) | Err(BackendError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let registered = self.tasks.register_task_definition(&plan.definition).await?;
        info!("Registered task definition {}", registered.arn);
        Ok(registered)
    }

    /// Request a stop. Convergence is observed later by the reconciler.
    pub async fn delete(&self, pod: &Pod) -> Result<(), ProviderError> {
        let key = pod.key();
        let entry = self
            .mapping
            .get(&key)
            .await
            .ok_or_else(|| ProviderError::NotFound(format!("pod {}", key)))?;

        match self
            .tasks
            .stop_task(&self.context.cluster, &entry.handle, DELETE_REASON)
            .await
        {
            Ok(()) => {}
            Err(BackendError::NotFound(_)) => {
                warn!(
                    "Task {} for pod {} already gone; dropping mapping",
                    entry.handle, key
                );
                self.mapping.remove_if_handle(&key, &entry.handle).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if entry.is_terminal() {
            self.mapping.remove_if_handle(&key, &entry.handle).await;
            info!("Pod {} deleted; task {} had already finished", key, entry.handle);
        } else {
            self.mapping
                .update(&key, &entry.handle, |t| t.delete_requested = true)
                .await;
            info!("Stop requested for task {} of pod {}", entry.handle, key);
        }
        Ok(())
    }

    /// Keys whose task is still live as far as we last observed.
    pub async fn list(&self) -> Vec<PodKey> {
        self.mapping
            .snapshot()
            .await
            .into_iter()
            .filter(|(_, t)| !t.is_terminal())
            .map(|(k, _)| k)
            .collect()
    }

    /// Rebuild the mapping from the task service's own tags. Returns how many
    /// entries were added.
    pub async fn resync(&self) -> Result<usize, ProviderError> {
        let handles = self
            .tasks
            .list_tasks(&self.context.cluster, &self.context.started_by)
            .await?;
        debug!("Resync found {} task(s) started by {}", handles.len(), self.context.started_by);
        if handles.is_empty() {
            return Ok(0);
        }

        let described = describe_batched(
            self.tasks.as_ref(),
            &self.throttle,
            &self.context.cluster,
            &handles,
        )
        .await?;

        let mut newest: HashMap<PodKey, TaskDescription> = HashMap::new();
        for outcome in described.into_values() {
            let Described::Found(task) = outcome else {
                continue;
            };
            if task.stopped_reason.as_deref() == Some(DELETE_REASON) {
                continue;
            }
            let Some(pod) = pod_from_tags(&task) else {
                debug!("Task {} has no pod identity tags; skipping", task.handle);
                continue;
            };
            let key = pod.key();
            let replace = newest
                .get(&key)
                .map_or(true, |current| task.created_at > current.created_at);
            if replace {
                newest.insert(key, *task);
            }
        }

        let mut added = 0;
        for (key, task) in newest {
            let Some(pod) = pod_from_tags(&task) else {
                continue;
            };
            let tracked = TrackedTask::new(pod, task.handle.clone(), family_name(&key));
            if self.mapping.insert_if_absent(key.clone(), tracked).await {
                info!("Recovered pod {} as task {}", key, task.handle);
                added += 1;
            }
        }
        Ok(added)
    }
}

/// Minimal pod rebuilt from a task's identity tags and container list.
pub fn pod_from_tags(task: &TaskDescription) -> Option<Pod> {
    let namespace = tag_value(&task.tags, TAG_NAMESPACE)?;
    let name = tag_value(&task.tags, TAG_NAME)?;
    let uid = tag_value(&task.tags, TAG_UID).unwrap_or_default();
    let containers = task
        .containers
        .iter()
        .map(|c| Container::new(&c.name, &c.image))
        .collect();
    Some(Pod::new(namespace, name, uid, containers))
}
