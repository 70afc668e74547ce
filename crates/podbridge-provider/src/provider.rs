use crate::lifecycle::LifecycleManager;
use crate::logs::LogRetriever;
use crate::mapping::IdentityMapping;
use crate::reconciler::StatusReconciler;
use crate::throttle::ApiThrottle;
use crate::translator::TranslatorContext;
use podbridge_core::node::NodeAddress;
use podbridge_core::pod::{Phase, Pod, PodKey, PodStatus};
use podbridge_core::{LogStore, NodeCapacity, NodeInfo, ProviderConfig, ProviderError, TaskService};
use std::sync::Arc;

/// Front-end facing provider. Owns the back-end handles and the identity
/// mapping for its whole lifetime; separate instances share nothing.
pub struct Provider {
    config: ProviderConfig,
    node: NodeInfo,
    mapping: Arc<IdentityMapping>,
    lifecycle: LifecycleManager,
    reconciler: StatusReconciler,
    logs: LogRetriever,
}

impl Provider {
    pub fn new(
        config: ProviderConfig,
        node: NodeInfo,
        tasks: Arc<dyn TaskService>,
        log_store: Arc<dyn LogStore>,
    ) -> Result<Self, ProviderError> {
        config.validate()?;

        let mapping = Arc::new(IdentityMapping::new());
        let status_throttle = ApiThrottle::new(config.max_concurrent_requests);
        let log_throttle = ApiThrottle::new(config.max_concurrent_requests);

        let lifecycle = LifecycleManager::new(
            tasks.clone(),
            mapping.clone(),
            TranslatorContext::from_config(&config),
            status_throttle.clone(),
        );
        let reconciler = StatusReconciler::new(
            tasks,
            mapping.clone(),
            config.cluster.clone(),
            status_throttle,
        );
        let logs = LogRetriever::new(log_store, mapping.clone(), config.log_group.clone(), log_throttle);

        Ok(Self {
            config,
            node,
            mapping,
            lifecycle,
            reconciler,
            logs,
        })
    }

    /// Re-derive the mapping from the task service. Call once after
    /// construction when tasks may have been launched by an earlier process.
    pub async fn resync(&self) -> Result<usize, ProviderError> {
        self.lifecycle.resync().await
    }

    /// Every tracked pod with its current status.
    pub async fn get_pods(&self) -> Result<Vec<(Pod, PodStatus)>, ProviderError> {
        self.reconciler.status_all().await
    }

    pub async fn get_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<(Pod, PodStatus)>, ProviderError> {
        self.reconciler.pod(&PodKey::new(namespace, name)).await
    }

    pub async fn create_pod(&self, pod: &Pod) -> Result<(), ProviderError> {
        self.lifecycle.create(pod).await.map(|_| ())
    }

    pub async fn delete_pod(&self, pod: &Pod) -> Result<(), ProviderError> {
        self.lifecycle.delete(pod).await
    }

    /// `Ok(None)` when the pod is not (or no longer) running here.
    pub async fn get_pod_status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PodStatus>, ProviderError> {
        self.reconciler.status(&PodKey::new(namespace, name)).await
    }

    pub async fn get_pod_phase(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Phase>, ProviderError> {
        Ok(self
            .get_pod_status(namespace, name)
            .await?
            .map(|status| status.phase))
    }

    pub async fn get_container_logs(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        tail_lines: usize,
    ) -> Result<String, ProviderError> {
        self.logs.logs(namespace, name, container, tail_lines).await
    }

    /// Keys of pods whose task was last seen live. Makes no back-end call.
    pub async fn live_pods(&self) -> Vec<PodKey> {
        self.lifecycle.list().await
    }

    pub async fn tracked_count(&self) -> usize {
        self.mapping.len().await
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node
    }

    pub fn capacity(&self) -> &NodeCapacity {
        &self.config.capacity
    }

    pub fn operating_system(&self) -> &str {
        &self.node.operating_system
    }

    pub fn node_addresses(&self) -> Vec<NodeAddress> {
        vec![NodeAddress {
            kind: "InternalIP".to_string(),
            address: self.node.internal_ip.clone(),
        }]
    }

    pub fn daemon_endpoint_port(&self) -> u16 {
        self.node.daemon_endpoint_port
    }
}
