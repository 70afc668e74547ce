use serde::{Deserialize, Serialize};

/// Identity of the virtual node the provider registers with the front end.
/// None of it is used for running tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub operating_system: String,
    pub internal_ip: String,
    pub daemon_endpoint_port: u16,
}

impl NodeInfo {
    pub fn new(
        name: impl Into<String>,
        operating_system: impl Into<String>,
        internal_ip: impl Into<String>,
        daemon_endpoint_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            operating_system: operating_system.into(),
            internal_ip: internal_ip.into(),
            daemon_endpoint_port,
        }
    }
}

/// Resources advertised for the virtual node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeCapacity {
    #[serde(default = "default_cpu")]
    pub cpu: String,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_pods")]
    pub pods: String,
}

fn default_cpu() -> String {
    "20".to_string()
}

fn default_memory() -> String {
    "40Gi".to_string()
}

fn default_pods() -> String {
    "20".to_string()
}

impl Default for NodeCapacity {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            memory: default_memory(),
            pods: default_pods(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub kind: String,
    pub address: String,
}
