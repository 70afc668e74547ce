use crate::error::ProviderError;
use crate::node::NodeCapacity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static provider configuration. Every identifier refers to infrastructure
/// provisioned outside the provider (cluster, log group, role, network).
///
/// Keys are PascalCase, so the same file works as TOML
/// (`Cluster = "..."`) or YAML (`Cluster: ...`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderConfig {
    pub region: String,
    pub cluster: String,
    #[serde(rename = "CloudWatchLogGroup")]
    pub log_group: String,
    pub execution_role_arn: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default = "default_assign_public_ip")]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default = "default_started_by")]
    pub started_by: String,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub capacity: NodeCapacity,
    #[serde(default = "default_aws_cli")]
    pub aws_cli: String,
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_assign_public_ip() -> bool {
    true
}

fn default_started_by() -> String {
    "podbridge".to_string()
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_aws_cli() -> String {
    "aws".to_string()
}

impl ProviderConfig {
    /// Config with the required identifiers and every option at its default.
    pub fn new(
        region: impl Into<String>,
        cluster: impl Into<String>,
        log_group: impl Into<String>,
        execution_role_arn: impl Into<String>,
        subnets: Vec<String>,
    ) -> Self {
        Self {
            region: region.into(),
            cluster: cluster.into(),
            log_group: log_group.into(),
            execution_role_arn: execution_role_arn.into(),
            subnets,
            security_groups: Vec::new(),
            assign_public_ip: default_assign_public_ip(),
            platform_version: None,
            started_by: default_started_by(),
            max_concurrent_requests: default_max_concurrent_requests(),
            capacity: NodeCapacity::default(),
            aws_cli: default_aws_cli(),
            profile: None,
        }
    }

    /// Load from the default path (<config dir>/podbridge/provider.toml).
    pub fn load_default() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a file: TOML for `.toml`, YAML for anything else.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ProviderConfig = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("podbridge")
            .join("provider.toml")
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        let required = [
            ("Region", &self.region),
            ("Cluster", &self.cluster),
            ("CloudWatchLogGroup", &self.log_group),
            ("ExecutionRoleArn", &self.execution_role_arn),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ProviderError::Config(format!("'{}' must not be empty", key)));
            }
        }
        if self.subnets.is_empty() {
            return Err(ProviderError::Config(
                "'Subnets' must list at least one subnet".into(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ProviderError::Config(
                "'MaxConcurrentRequests' must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
