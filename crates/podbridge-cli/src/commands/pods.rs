use super::age;
use podbridge_provider::Provider;

pub async fn run(provider: &Provider, json: bool) -> anyhow::Result<()> {
    let pods = provider.get_pods().await?;

    if json {
        let entries: Vec<serde_json::Value> = pods
            .iter()
            .map(|(pod, status)| {
                serde_json::json!({
                    "namespace": pod.namespace(),
                    "name": pod.name(),
                    "uid": pod.uid(),
                    "status": status,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if pods.is_empty() {
        println!("No pods found.");
        return Ok(());
    }
    println!(
        "{:<15} {:<30} {:<10} {:<16} {}",
        "NAMESPACE", "NAME", "PHASE", "IP", "AGE"
    );
    println!("{}", "-".repeat(80));
    for (pod, status) in &pods {
        println!(
            "{:<15} {:<30} {:<10} {:<16} {}",
            pod.namespace(),
            pod.name(),
            status.phase,
            status.pod_ip.as_deref().unwrap_or("-"),
            age(status.start_time),
        );
    }

    Ok(())
}
