use super::parse_pod_ref;
use podbridge_provider::Provider;
use std::io::Write;

pub async fn run(provider: &Provider, pod_ref: &str, container: &str, tail: usize) -> anyhow::Result<()> {
    let (namespace, name) = parse_pod_ref(pod_ref)?;
    let logs = provider
        .get_container_logs(&namespace, &name, container, tail)
        .await?;

    if logs.is_empty() {
        eprintln!("(no output yet)");
        return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(logs.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
