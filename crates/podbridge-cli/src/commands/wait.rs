use super::parse_pod_ref;
use super::status::print_status;
use podbridge_core::Phase;
use podbridge_provider::{wait_for_phase, Provider, WaitOptions};
use std::time::Duration;

pub async fn run(
    provider: &Provider,
    pod_ref: &str,
    phase: &str,
    timeout_secs: u64,
    interval_secs: u64,
) -> anyhow::Result<()> {
    let (namespace, name) = parse_pod_ref(pod_ref)?;
    let desired: Phase = phase.parse().map_err(anyhow::Error::msg)?;
    let options = WaitOptions {
        timeout: Duration::from_secs(timeout_secs),
        interval: Duration::from_secs(interval_secs.max(1)),
    };

    eprintln!("Waiting up to {}s for {}/{} to be {}...", timeout_secs, namespace, name, desired);
    match wait_for_phase(provider, &namespace, &name, desired, options).await? {
        Some(status) => {
            print_status(&namespace, &name, &status);
            if status.phase != desired {
                anyhow::bail!("Pod ended {} instead of {}", status.phase, desired);
            }
        }
        None => println!("Pod {}/{} is gone", namespace, name),
    }
    Ok(())
}
