pub mod create;
pub mod delete;
pub mod logs;
pub mod node;
pub mod pods;
pub mod status;
pub mod wait;

/// Split `namespace/name`; a bare name lands in `default`.
pub fn parse_pod_ref(pod: &str) -> anyhow::Result<(String, String)> {
    let (namespace, name) = match pod.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("default", pod),
    };
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        anyhow::bail!("Expected <namespace>/<name>, got '{}'", pod);
    }
    Ok((namespace.to_string(), name.to_string()))
}

/// Short age like `5m` or `2h` for table output.
pub fn age(since: Option<chrono::DateTime<chrono::Utc>>) -> String {
    let Some(since) = since else {
        return "-".to_string();
    };
    let secs = (chrono::Utc::now() - since).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}
