use podbridge_core::{BackendError, ProviderConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

/// One AWS CLI binary bound to a region and, optionally, a named profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCli {
    program: String,
    region: String,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new(program: impl Into<String>, region: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            program: program.into(),
            region: region.into(),
            profile,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.aws_cli, &config.region, config.profile.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for a call: the service arguments followed by the
    /// global region/output/profile options.
    pub fn command_line(&self, args: &[&str]) -> Vec<String> {
        let mut line: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        line.push("--region".to_string());
        line.push(self.region.clone());
        line.push("--output".to_string());
        line.push("json".to_string());
        if let Some(ref profile) = self.profile {
            line.push("--profile".to_string());
            line.push(profile.clone());
        }
        line
    }

    /// Run a CLI command and return stdout.
    pub async fn run(&self, args: &[&str]) -> Result<String, BackendError> {
        debug!(
            "Running: {} {}",
            self.program,
            args.iter().take(2).copied().collect::<Vec<_>>().join(" ")
        );

        let output = Command::new(&self.program)
            .args(self.command_line(args))
            .env("AWS_PAGER", "")
            .output()
            .await
            .map_err(|e| {
                BackendError::Unavailable(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                "{} {} failed: {}",
                self.program,
                args.get(1).unwrap_or(&""),
                stderr.trim()
            );
            return Err(classify_error(stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a command and parse its JSON output.
    pub async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, BackendError> {
        let stdout = self.run(args).await?;
        crate::response::parse(&stdout)
    }

    /// Run `<service> <operation> --cli-input-json <input>` and parse the output.
    pub async fn call<I: Serialize, T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        input: &I,
    ) -> Result<T, BackendError> {
        let json = serde_json::to_string(input)
            .map_err(|e| BackendError::Rejected(format!("Cannot encode {} input: {}", operation, e)))?;
        self.run_json(&[service, operation, "--cli-input-json", &json])
            .await
    }
}

/// Map a failed call's stderr onto the back-end error kinds.
pub fn classify_error(stderr: &str) -> BackendError {
    let message = stderr.to_string();
    let throttled = ["ThrottlingException", "Rate exceeded", "TooManyRequestsException"];
    let unavailable = [
        "Could not connect",
        "EndpointConnectionError",
        "timed out",
        "ServerException",
        "ServiceUnavailableException",
    ];
    let not_found = [
        "ResourceNotFoundException",
        "Unable to describe task definition",
        "task was not found",
        "does not exist",
    ];

    if throttled.iter().any(|p| stderr.contains(p)) {
        BackendError::Throttled(message)
    } else if unavailable.iter().any(|p| stderr.contains(p)) {
        BackendError::Unavailable(message)
    } else if not_found.iter().any(|p| stderr.contains(p)) {
        BackendError::NotFound(message)
    } else {
        BackendError::Rejected(message)
    }
}
