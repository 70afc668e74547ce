use crate::NodeArgs;
use podbridge_aws::{AwsCli, AwsCliLogStore, AwsCliTaskService};
use podbridge_core::{LogStore, NodeInfo, ProviderConfig, TaskService};
use podbridge_provider::Provider;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load the provider config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(ProviderConfig::default_path);
    if !path.exists() {
        anyhow::bail!(
            "No provider config at {}. Pass --config or create one.",
            path.display()
        );
    }
    ProviderConfig::load_from(&path)
}

pub fn node_info(args: &NodeArgs) -> NodeInfo {
    NodeInfo::new(
        &args.node_name,
        &args.operating_system,
        &args.internal_ip,
        args.daemon_port,
    )
}

/// Build a provider on the AWS CLI back-ends. Makes no back-end call.
pub fn build_provider(config: ProviderConfig, node: &NodeArgs) -> anyhow::Result<Provider> {
    let cli = AwsCli::from_config(&config);
    let tasks: Arc<dyn TaskService> = Arc::new(AwsCliTaskService::new(cli.clone()));
    let logs: Arc<dyn LogStore> = Arc::new(AwsCliLogStore::new(cli));
    Ok(Provider::new(config, node_info(node), tasks, logs)?)
}

/// Build a provider and recover the tasks launched by earlier runs.
pub async fn create_provider(config: ProviderConfig, node: &NodeArgs) -> anyhow::Result<Provider> {
    let provider = build_provider(config, node)?;
    let recovered = provider.resync().await?;
    debug!("Recovered {} pod(s) from earlier runs", recovered);
    Ok(provider)
}
