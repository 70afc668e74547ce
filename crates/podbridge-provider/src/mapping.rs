use chrono::{DateTime, Utc};
use podbridge_core::ecs::TaskHandle;
use podbridge_core::pod::{Phase, Pod, PodKey};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// One tracked pod and the task that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTask {
    pub pod: Pod,
    pub handle: TaskHandle,
    pub family: String,
    pub delete_requested: bool,
    /// Last phase reported for this task, used to keep reports monotone.
    pub last_phase: Option<Phase>,
    pub launched_at: DateTime<Utc>,
}

impl TrackedTask {
    pub fn new(pod: Pod, handle: TaskHandle, family: String) -> Self {
        Self {
            pod,
            handle,
            family,
            delete_requested: false,
            last_phase: None,
            launched_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.last_phase.is_some_and(|p| p.is_terminal())
    }
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<PodKey, TrackedTask>,
    /// Keys with a create in flight.
    reserved: HashSet<PodKey>,
}

/// PodKey to task table shared by every component. Lock guards are never
/// held across a back-end call.
#[derive(Debug, Default)]
pub struct IdentityMapping {
    table: RwLock<Table>,
}

impl IdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &PodKey) -> Option<TrackedTask> {
        self.table.read().await.entries.get(key).cloned()
    }

    pub async fn contains(&self, key: &PodKey) -> bool {
        self.table.read().await.entries.contains_key(key)
    }

    /// All entries, ordered by key.
    pub async fn snapshot(&self) -> Vec<(PodKey, TrackedTask)> {
        let table = self.table.read().await;
        let mut entries: Vec<_> = table
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Claim `key` for a create. Returns false if another create holds it.
    pub async fn reserve(&self, key: &PodKey) -> bool {
        self.table.write().await.reserved.insert(key.clone())
    }

    pub async fn release(&self, key: &PodKey) {
        self.table.write().await.reserved.remove(key);
    }

    pub async fn insert(&self, key: PodKey, task: TrackedTask) {
        self.table.write().await.entries.insert(key, task);
    }

    /// Insert unless the key is already tracked or has a create in flight.
    pub async fn insert_if_absent(&self, key: PodKey, task: TrackedTask) -> bool {
        let mut table = self.table.write().await;
        if table.entries.contains_key(&key) || table.reserved.contains(&key) {
            return false;
        }
        table.entries.insert(key, task);
        true
    }

    /// Remove the entry only if it still points at `handle`.
    pub async fn remove_if_handle(&self, key: &PodKey, handle: &TaskHandle) -> Option<TrackedTask> {
        let mut table = self.table.write().await;
        if table.entries.get(key).is_some_and(|t| &t.handle == handle) {
            table.entries.remove(key)
        } else {
            None
        }
    }

    /// Apply `f` to the entry if it still points at `handle`.
    pub async fn update<F, R>(&self, key: &PodKey, handle: &TaskHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut TrackedTask) -> R,
    {
        let mut table = self.table.write().await;
        match table.entries.get_mut(key) {
            Some(task) if &task.handle == handle => Some(f(task)),
            _ => None,
        }
    }
}
