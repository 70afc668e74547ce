use crate::provider::Provider;
use podbridge_core::pod::{Phase, PodStatus};
use podbridge_core::ProviderError;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(3),
        }
    }
}

/// Poll until the pod reaches `desired`, ends in another terminal phase, or
/// disappears (`Ok(None)`). On expiry returns `Timeout` and changes nothing.
pub async fn wait_for_phase(
    provider: &Provider,
    namespace: &str,
    name: &str,
    desired: Phase,
    options: WaitOptions,
) -> Result<Option<PodStatus>, ProviderError> {
    tokio::time::timeout(
        options.timeout,
        poll_until(provider, namespace, name, desired, options.interval),
    )
    .await
    .map_err(|_| ProviderError::Timeout(options.timeout))?
}

async fn poll_until(
    provider: &Provider,
    namespace: &str,
    name: &str,
    desired: Phase,
    interval: Duration,
) -> Result<Option<PodStatus>, ProviderError> {
    loop {
        match provider.get_pod_status(namespace, name).await? {
            None => return Ok(None),
            Some(status) if status.phase == desired || status.phase.is_terminal() => {
                return Ok(Some(status))
            }
            Some(status) => {
                debug!("Pod {}/{} is {}; waiting for {}", namespace, name, status.phase, desired);
            }
        }
        tokio::time::sleep(interval).await;
    }
}
