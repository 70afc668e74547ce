use podbridge_core::Pod;
use podbridge_provider::Provider;
use std::path::Path;

pub async fn run(provider: &Provider, manifest: &Path) -> anyhow::Result<()> {
    let pod = Pod::load_manifest(manifest)?;
    provider.create_pod(&pod).await?;
    println!("Pod {} created", pod.key());
    println!("Run `podbridge wait {}` to follow it.", pod.key());
    Ok(())
}
