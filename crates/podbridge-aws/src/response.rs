//! JSON output of the ECS and CloudWatch Logs CLI commands, and its
//! conversion into the provider's payload types.

use chrono::{DateTime, TimeZone, Utc};
use podbridge_core::ecs::{
    ContainerDescription, DescribeTasksOutput, LogEvent, RegisteredDefinition, Tag,
    TaskDescription, TaskFailure, TaskHandle, TaskState,
};
use podbridge_core::BackendError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

pub fn parse<T: DeserializeOwned>(stdout: &str) -> Result<T, BackendError> {
    serde_json::from_str(stdout)
        .map_err(|e| BackendError::Malformed(format!("Unexpected CLI output: {}", e)))
}

/// CLI v2 prints timestamps as RFC 3339 strings, v1 as epoch seconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Seconds(f64),
    Text(String),
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Timestamp> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw {
        Timestamp::Seconds(secs) => {
            let millis = (secs * 1000.0).round() as i64;
            Ok(Utc.timestamp_millis_opt(millis).single())
        }
        Timestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionResponse {
    pub task_definition: RawTaskDefinition,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskDefinition {
    pub task_definition_arn: String,
    pub family: String,
    pub revision: u32,
}

impl TaskDefinitionResponse {
    pub fn into_registered(self) -> RegisteredDefinition {
        RegisteredDefinition {
            arn: self.task_definition.task_definition_arn,
            family: self.task_definition.family,
            revision: self.task_definition.revision,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksResponse {
    #[serde(default)]
    pub tasks: Vec<RawTask>,
    #[serde(default)]
    pub failures: Vec<RawFailure>,
}

impl TasksResponse {
    pub fn into_output(self) -> DescribeTasksOutput {
        DescribeTasksOutput {
            tasks: self.tasks.into_iter().map(RawTask::into_description).collect(),
            failures: self.failures.into_iter().map(RawFailure::into_failure).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    pub task_arn: String,
    #[serde(default)]
    pub task_definition_arn: String,
    pub last_status: Option<TaskState>,
    pub desired_status: Option<TaskState>,
    pub stop_code: Option<String>,
    pub stopped_reason: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub containers: Vec<RawContainer>,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContainer {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub last_status: Option<TaskState>,
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
    #[serde(default)]
    pub network_interfaces: Vec<RawNetworkInterface>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNetworkInterface {
    pub private_ipv4_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAttachment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub details: Vec<RawDetail>,
}

#[derive(Debug, Deserialize)]
pub struct RawDetail {
    pub name: String,
    pub value: Option<String>,
}

impl RawTask {
    /// Task IP from the ENI attachment, falling back to the first container
    /// network interface.
    pub fn private_ip(&self) -> Option<String> {
        self.attachments
            .iter()
            .filter(|a| a.kind == "ElasticNetworkInterface")
            .flat_map(|a| &a.details)
            .find(|d| d.name == "privateIPv4Address")
            .and_then(|d| d.value.clone())
            .or_else(|| {
                self.containers
                    .iter()
                    .flat_map(|c| &c.network_interfaces)
                    .find_map(|n| n.private_ipv4_address.clone())
            })
    }

    pub fn into_description(self) -> TaskDescription {
        let private_ip = self.private_ip();
        TaskDescription {
            handle: TaskHandle(self.task_arn),
            task_definition_arn: self.task_definition_arn,
            last_status: self.last_status.unwrap_or(TaskState::Unknown),
            desired_status: self.desired_status.unwrap_or(TaskState::Unknown),
            stop_code: self.stop_code,
            stopped_reason: self.stopped_reason,
            created_at: self.created_at,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            private_ip,
            containers: self
                .containers
                .into_iter()
                .map(|c| ContainerDescription {
                    name: c.name,
                    image: c.image,
                    last_status: c.last_status.unwrap_or(TaskState::Unknown),
                    exit_code: c.exit_code,
                    reason: c.reason,
                })
                .collect(),
            tags: self.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFailure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl RawFailure {
    pub fn into_failure(self) -> TaskFailure {
        TaskFailure {
            arn: self.arn.unwrap_or_default(),
            reason: self.reason.unwrap_or_default(),
        }
    }

    pub fn describe(&self) -> String {
        match (&self.reason, &self.detail) {
            (Some(reason), Some(detail)) => format!("{} ({})", reason, detail),
            (Some(reason), None) => reason.clone(),
            (None, Some(detail)) => detail.clone(),
            (None, None) => "no reason given".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    #[serde(default)]
    pub task_arns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogEventsResponse {
    #[serde(default)]
    pub events: Vec<RawLogEvent>,
}

#[derive(Debug, Deserialize)]
pub struct RawLogEvent {
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
}

impl LogEventsResponse {
    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
            .into_iter()
            .map(|e| LogEvent {
                timestamp: e.timestamp,
                message: e.message,
            })
            .collect()
    }
}
