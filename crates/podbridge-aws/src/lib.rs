//! Back-ends that talk to ECS and CloudWatch Logs by shelling out to the
//! AWS CLI. Payloads go in as `--cli-input-json` and come back as JSON.

pub mod cli;
pub mod log_store;
pub mod response;
pub mod task_service;

pub use cli::{classify_error, AwsCli};
pub use log_store::AwsCliLogStore;
pub use task_service::AwsCliTaskService;
