use super::parse_pod_ref;
use podbridge_provider::Provider;

pub async fn run(provider: &Provider, pod_ref: &str) -> anyhow::Result<()> {
    let (namespace, name) = parse_pod_ref(pod_ref)?;
    let Some((pod, _)) = provider.get_pod(&namespace, &name).await? else {
        anyhow::bail!("Pod {}/{} not found", namespace, name);
    };

    provider.delete_pod(&pod).await?;
    println!("Stop requested for pod {}", pod.key());
    Ok(())
}
