pub mod backend;
pub mod config;
pub mod ecs;
pub mod error;
pub mod node;
pub mod pod;
pub mod quantity;

pub use backend::{LogStore, TaskService};
pub use config::ProviderConfig;
pub use error::{BackendError, ProviderError};
pub use node::{NodeCapacity, NodeInfo};
pub use pod::{Phase, Pod, PodKey, PodStatus};
pub use quantity::{CpuShares, Memory};
