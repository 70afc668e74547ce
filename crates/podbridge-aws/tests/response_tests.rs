#[cfg(test)]
mod tests {
    use podbridge_aws::response::{
        parse, ListTasksResponse, LogEventsResponse, TaskDefinitionResponse, TasksResponse,
    };
    use podbridge_aws::{classify_error, AwsCli};
    use podbridge_core::ecs::{tag_value, TaskState};
    use podbridge_core::BackendError;

    const DESCRIBE_TASKS: &str = r#"{
        "tasks": [
            {
                "taskArn": "arn:aws:ecs:us-east-1:123456789012:task/vk-aws-e2e-test/0f3c",
                "taskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/default__web:3",
                "lastStatus": "STOPPED",
                "desiredStatus": "STOPPED",
                "stopCode": "EssentialContainerExited",
                "stoppedReason": "Essential container in task exited",
                "createdAt": "2024-05-01T10:00:00.123000+00:00",
                "startedAt": 1714557605.5,
                "stoppedAt": "2024-05-01T10:05:00+00:00",
                "attachments": [
                    {
                        "type": "ElasticNetworkInterface",
                        "status": "DELETED",
                        "details": [
                            {"name": "subnetId", "value": "subnet-0a1b2c3d"},
                            {"name": "privateIPv4Address", "value": "10.0.1.17"}
                        ]
                    }
                ],
                "containers": [
                    {"name": "app", "image": "busybox", "lastStatus": "STOPPED", "exitCode": 0},
                    {"name": "sidecar", "image": "nginx", "lastStatus": "STOPPED", "exitCode": 137, "reason": "OutOfMemoryError"}
                ],
                "tags": [
                    {"key": "podbridge.io/namespace", "value": "default"},
                    {"key": "podbridge.io/name", "value": "web"}
                ]
            }
        ],
        "failures": [
            {"arn": "arn:aws:ecs:us-east-1:123456789012:task/vk-aws-e2e-test/gone", "reason": "MISSING"}
        ]
    }"#;

    #[test]
    fn test_describe_tasks_parses() {
        let output = parse::<TasksResponse>(DESCRIBE_TASKS).unwrap().into_output();
        assert_eq!(output.tasks.len(), 1);
        let task = &output.tasks[0];
        assert_eq!(task.handle.task_id(), "0f3c");
        assert_eq!(task.last_status, TaskState::Stopped);
        assert_eq!(task.stop_code.as_deref(), Some("EssentialContainerExited"));
        assert_eq!(task.private_ip.as_deref(), Some("10.0.1.17"));
        assert_eq!(task.created_at.unwrap().timestamp(), 1714557600);
        assert_eq!(task.started_at.unwrap().timestamp_millis(), 1714557605500);
        assert!(task.stopped_at.is_some());
        assert_eq!(task.containers[1].exit_code, Some(137));
        assert_eq!(task.containers[1].reason.as_deref(), Some("OutOfMemoryError"));
        assert_eq!(tag_value(&task.tags, "podbridge.io/name"), Some("web"));

        assert_eq!(output.failures.len(), 1);
        assert!(output.failures[0].is_missing());
    }

    #[test]
    fn test_unrecognised_status_is_unknown() {
        let json = r#"{"tasks": [{"taskArn": "arn:t/1", "lastStatus": "HIBERNATING", "containers": []}]}"#;
        let output = parse::<TasksResponse>(json).unwrap().into_output();
        assert_eq!(output.tasks[0].last_status, TaskState::Unknown);
        assert_eq!(output.tasks[0].desired_status, TaskState::Unknown);
        assert!(output.tasks[0].private_ip.is_none());
    }

    #[test]
    fn test_private_ip_falls_back_to_container_interface() {
        let json = r#"{"tasks": [{
            "taskArn": "arn:t/2",
            "lastStatus": "RUNNING",
            "containers": [{"name": "app", "lastStatus": "RUNNING",
                            "networkInterfaces": [{"privateIpv4Address": "10.0.2.9"}]}]
        }]}"#;
        let output = parse::<TasksResponse>(json).unwrap().into_output();
        assert_eq!(output.tasks[0].private_ip.as_deref(), Some("10.0.2.9"));
    }

    #[test]
    fn test_task_definition_response() {
        let json = r#"{
            "taskDefinition": {
                "taskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/default__web:3",
                "family": "default__web",
                "revision": 3,
                "status": "ACTIVE"
            },
            "tags": [{"key": "podbridge.io/fingerprint", "value": "abc123"}]
        }"#;
        let registered = parse::<TaskDefinitionResponse>(json).unwrap().into_registered();
        assert_eq!(registered.family, "default__web");
        assert_eq!(registered.revision, 3);
        assert_eq!(tag_value(&registered.tags, "podbridge.io/fingerprint"), Some("abc123"));
    }

    #[test]
    fn test_list_and_log_responses() {
        let list: ListTasksResponse =
            parse(r#"{"taskArns": ["arn:t/1", "arn:t/2"]}"#).unwrap();
        assert_eq!(list.task_arns.len(), 2);

        let logs: LogEventsResponse = parse(
            r#"{"events": [{"timestamp": 1714557600000, "message": "Started", "ingestionTime": 1714557600100}],
                "nextForwardToken": "f/1", "nextBackwardToken": "b/1"}"#,
        )
        .unwrap();
        let events = logs.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Started");
    }

    #[test]
    fn test_malformed_output() {
        let err = parse::<TasksResponse>("not json").unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error("An error occurred (ThrottlingException) when calling the DescribeTasks operation: Rate exceeded"),
            BackendError::Throttled(_)
        ));
        assert!(matches!(
            classify_error("Could not connect to the endpoint URL: \"https://ecs.us-east-1.amazonaws.com/\""),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            classify_error("An error occurred (ServerException) when calling the RunTask operation"),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            classify_error("An error occurred (ClientException) when calling the DescribeTaskDefinition operation: Unable to describe task definition."),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            classify_error("An error occurred (ResourceNotFoundException) when calling the GetLogEvents operation: The specified log stream does not exist."),
            BackendError::NotFound(ref msg) if msg.contains("log stream")
        ));
        assert!(matches!(
            classify_error("An error occurred (InvalidParameterException) when calling the StopTask operation: The referenced task was not found."),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            classify_error("An error occurred (ClientException) when calling the RegisterTaskDefinition operation: Invalid 'cpu' setting"),
            BackendError::Rejected(_)
        ));
    }

    #[test]
    fn test_command_line_appends_globals() {
        let cli = AwsCli::new("aws", "us-east-1", None);
        assert_eq!(
            cli.command_line(&["ecs", "list-tasks"]),
            vec!["ecs", "list-tasks", "--region", "us-east-1", "--output", "json"]
        );

        let cli = AwsCli::new("/usr/local/bin/aws", "eu-west-1", Some("ops".into()));
        let line = cli.command_line(&["logs", "get-log-events"]);
        assert_eq!(&line[line.len() - 2..], ["--profile", "ops"]);
        assert_eq!(cli.program(), "/usr/local/bin/aws");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let cli = AwsCli::new("/nonexistent/podbridge-aws-cli", "us-east-1", None);
        let err = cli.run(&["ecs", "list-clusters"]).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
