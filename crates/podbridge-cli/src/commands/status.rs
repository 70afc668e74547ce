use super::{age, parse_pod_ref};
use podbridge_core::pod::{ContainerState, PodStatus};
use podbridge_provider::Provider;

pub async fn run(provider: &Provider, pod_ref: &str, json: bool) -> anyhow::Result<()> {
    let (namespace, name) = parse_pod_ref(pod_ref)?;
    let Some(status) = provider.get_pod_status(&namespace, &name).await? else {
        anyhow::bail!("Pod {}/{} not found", namespace, name);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&namespace, &name, &status);
    }
    Ok(())
}

pub fn print_status(namespace: &str, name: &str, status: &PodStatus) {
    println!("Pod:      {}/{}", namespace, name);
    println!("Phase:    {}", status.phase);
    if let Some(ref reason) = status.reason {
        println!("Reason:   {}", reason);
    }
    if let Some(ref message) = status.message {
        println!("Message:  {}", message);
    }
    println!("IP:       {}", status.pod_ip.as_deref().unwrap_or("-"));
    println!("Age:      {}", age(status.start_time));

    if status.container_statuses.is_empty() {
        return;
    }
    println!("Containers:");
    for container in &status.container_statuses {
        let state = match &container.state {
            ContainerState::Waiting { reason } => {
                format!("waiting ({})", reason.as_deref().unwrap_or("-"))
            }
            ContainerState::Running { .. } => "running".to_string(),
            ContainerState::Terminated {
                exit_code, reason, ..
            } => format!(
                "terminated (exit {}{})",
                exit_code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
                reason.as_deref().map(|r| format!(", {}", r)).unwrap_or_default()
            ),
        };
        println!("  - {:<20} {:<30} {}", container.name, container.image, state);
    }
}
