//! Turns a pod into a task definition and a launch request. Pure, no I/O.

use podbridge_core::config::ProviderConfig;
use podbridge_core::ecs::{
    AwsVpcConfiguration, ContainerDefinition, KeyValuePair, LogConfiguration, MountPoint,
    NetworkConfiguration, PortMapping, RunTaskRequest, Tag, TaskDefinition, TaskHandle,
    TaskVolume,
};
use podbridge_core::pod::{Container, Pod, PodKey, VolumeSource};
use podbridge_core::ProviderError;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashSet};

pub const TAG_NAMESPACE: &str = "podbridge.io/namespace";
pub const TAG_NAME: &str = "podbridge.io/name";
pub const TAG_UID: &str = "podbridge.io/uid";
pub const TAG_FINGERPRINT: &str = "podbridge.io/fingerprint";

pub const MIN_CONTAINER_CPU_SHARES: u32 = 2;
pub const MIN_CONTAINER_MEMORY_MIB: u64 = 6;
pub const MAX_TASK_CPU: u32 = 16384;
pub const MAX_TASK_MEMORY_MIB: u64 = 122880;

const TASK_CPU_OPTIONS: [u32; 7] = [256, 512, 1024, 2048, 4096, 8192, 16384];
const MAX_FAMILY_LEN: usize = 255;
/// Hex digits of the identity hash appended to rewritten family names.
const FAMILY_HASH_LEN: usize = 8;

/// Everything the translator needs besides the pod itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorContext {
    pub region: String,
    pub cluster: String,
    pub log_group: String,
    pub execution_role_arn: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
    pub platform_version: Option<String>,
    pub started_by: String,
}

impl TranslatorContext {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            region: config.region.clone(),
            cluster: config.cluster.clone(),
            log_group: config.log_group.clone(),
            execution_role_arn: config.execution_role_arn.clone(),
            subnets: config.subnets.clone(),
            security_groups: config.security_groups.clone(),
            assign_public_ip: config.assign_public_ip,
            platform_version: config.platform_version.clone(),
            started_by: config.started_by.clone(),
        }
    }
}

/// Result of translating one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
    /// Definition to register, fingerprint tag included.
    pub definition: TaskDefinition,
    pub fingerprint: String,
    /// Launch request; `task_definition` holds the family until the
    /// registered ARN is known.
    pub launch: RunTaskRequest,
}

/// Task definition family for a pod: `namespace__name`, restricted to the
/// characters the service accepts. When either part had to be rewritten or
/// the result truncated, `_` plus a hash of the raw identity is appended so
/// distinct pods never share a family.
pub fn family_name(key: &PodKey) -> String {
    let raw = format!("{}__{}", key.namespace, key.name);
    let mut family: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if is_plain_segment(&key.namespace)
        && is_plain_segment(&key.name)
        && family.len() <= MAX_FAMILY_LEN
    {
        return family;
    }

    let mut hasher = Sha1::new();
    hasher.update(key.namespace.as_bytes());
    hasher.update([0u8]);
    hasher.update(key.name.as_bytes());
    let digest = hex::encode(hasher.finalize());
    family.truncate(MAX_FAMILY_LEN - FAMILY_HASH_LEN - 1);
    family.push('_');
    family.push_str(&digest[..FAMILY_HASH_LEN]);
    family
}

/// Segments made only of letters, digits and `-` map onto a family verbatim
/// and cannot blur the `__` separator.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Log stream written by the `awslogs` driver for one container of a task.
pub fn log_stream_name(family: &str, container: &str, handle: &TaskHandle) -> String {
    format!("{}/{}/{}", family, container, handle.task_id())
}

/// SHA-1 over the serialized definition.
pub fn fingerprint(definition: &TaskDefinition) -> Result<String, ProviderError> {
    let bytes = serde_json::to_vec(definition)?;
    Ok(hex::encode(Sha1::digest(&bytes)))
}

fn memory_options(cpu: u32) -> Vec<u64> {
    match cpu {
        256 => vec![512, 1024, 2048],
        512 => (1..=4).map(|g| g * 1024).collect(),
        1024 => (2..=8).map(|g| g * 1024).collect(),
        2048 => (4..=16).map(|g| g * 1024).collect(),
        4096 => (8..=30).map(|g| g * 1024).collect(),
        8192 => (16..=60).step_by(4).map(|g| g * 1024).collect(),
        16384 => (32..=120).step_by(8).map(|g| g * 1024).collect(),
        _ => Vec::new(),
    }
}

/// Smallest Fargate task size (cpu units, MiB) that holds the given totals.
pub fn fargate_size(cpu: u32, memory_mib: u64) -> Option<(u32, u64)> {
    TASK_CPU_OPTIONS
        .iter()
        .filter(|&&option| option >= cpu)
        .find_map(|&option| {
            memory_options(option)
                .into_iter()
                .find(|&m| m >= memory_mib)
                .map(|m| (option, m))
        })
}

fn reject(pod: &Pod, reason: String) -> ProviderError {
    ProviderError::Translation(format!("pod {}: {}", pod.key(), reason))
}

struct TranslatedContainer {
    definition: ContainerDefinition,
    cpu_total: u32,
    memory_total: u64,
}

fn translate_container(
    pod: &Pod,
    container: &Container,
    family: &str,
    ctx: &TranslatorContext,
    volumes: &HashSet<&str>,
) -> Result<TranslatedContainer, ProviderError> {
    if container.name.trim().is_empty() {
        return Err(reject(pod, "container without a name".into()));
    }
    if container.image.trim().is_empty() {
        return Err(reject(
            pod,
            format!("container '{}' has no image", container.name),
        ));
    }
    if container
        .security_context
        .as_ref()
        .is_some_and(|sc| sc.privileged)
    {
        return Err(reject(
            pod,
            format!("container '{}' requests privileged mode", container.name),
        ));
    }

    let requests = &container.resources.requests;
    let limits = &container.resources.limits;

    for cpu in [requests.cpu, limits.cpu].into_iter().flatten() {
        if cpu.shares() < MIN_CONTAINER_CPU_SHARES {
            return Err(reject(
                pod,
                format!(
                    "container '{}' cpu {} is below the minimum of {} shares",
                    container.name, cpu, MIN_CONTAINER_CPU_SHARES
                ),
            ));
        }
    }
    for memory in [requests.memory, limits.memory].into_iter().flatten() {
        if memory.mib_ceil() < MIN_CONTAINER_MEMORY_MIB {
            return Err(reject(
                pod,
                format!(
                    "container '{}' memory {} is below the minimum of {}Mi",
                    container.name, memory, MIN_CONTAINER_MEMORY_MIB
                ),
            ));
        }
    }
    if let (Some(request), Some(limit)) = (requests.cpu, limits.cpu) {
        if request > limit {
            return Err(reject(
                pod,
                format!(
                    "container '{}' cpu request {} exceeds its limit {}",
                    container.name, request, limit
                ),
            ));
        }
    }
    if let (Some(request), Some(limit)) = (requests.memory, limits.memory) {
        if request > limit {
            return Err(reject(
                pod,
                format!(
                    "container '{}' memory request {} exceeds its limit {}",
                    container.name, request, limit
                ),
            ));
        }
    }

    let mut mount_points = Vec::with_capacity(container.volume_mounts.len());
    for mount in &container.volume_mounts {
        if !volumes.contains(mount.name.as_str()) {
            return Err(reject(
                pod,
                format!(
                    "container '{}' mounts undeclared volume '{}'",
                    container.name, mount.name
                ),
            ));
        }
        mount_points.push(MountPoint {
            source_volume: mount.name.clone(),
            container_path: mount.mount_path.clone(),
            read_only: mount.read_only,
        });
    }

    let port_mappings = container
        .ports
        .iter()
        .map(|p| PortMapping {
            container_port: p.container_port,
            host_port: p.container_port,
            protocol: p.protocol.to_lowercase(),
        })
        .collect();

    let environment = container
        .env
        .iter()
        .map(|e| KeyValuePair {
            name: e.name.clone(),
            value: e.value.clone(),
        })
        .collect();

    let mut options = BTreeMap::new();
    options.insert("awslogs-group".to_string(), ctx.log_group.clone());
    options.insert("awslogs-region".to_string(), ctx.region.clone());
    options.insert("awslogs-stream-prefix".to_string(), family.to_string());

    let cpu_total = requests
        .cpu
        .max(limits.cpu)
        .map(|c| c.shares())
        .unwrap_or(0);
    let memory_total = requests
        .memory
        .max(limits.memory)
        .map(|m| m.mib_ceil())
        .unwrap_or(0);

    let definition = ContainerDefinition {
        name: container.name.clone(),
        image: container.image.clone(),
        essential: true,
        entry_point: container.command.clone(),
        command: container.args.clone(),
        environment,
        cpu: requests.cpu.or(limits.cpu).map(|c| c.shares()),
        memory: limits.memory.map(|m| m.mib_ceil()),
        memory_reservation: requests.memory.map(|m| m.mib_ceil()),
        port_mappings,
        working_directory: container.working_dir.clone(),
        mount_points,
        log_configuration: LogConfiguration {
            log_driver: "awslogs".to_string(),
            options,
        },
    };

    Ok(TranslatedContainer {
        definition,
        cpu_total,
        memory_total,
    })
}

/// Translate a pod. Any unsupported field fails the whole pod; nothing is
/// partially produced.
pub fn translate(pod: &Pod, ctx: &TranslatorContext) -> Result<TaskPlan, ProviderError> {
    let key = pod.key();
    if key.namespace.is_empty() || key.name.is_empty() {
        return Err(reject(pod, "namespace and name are required".into()));
    }
    if pod.spec.containers.is_empty() {
        return Err(reject(pod, "no containers".into()));
    }
    if !pod.spec.init_containers.is_empty() {
        return Err(reject(pod, "init containers are not supported".into()));
    }

    let mut volume_names = HashSet::new();
    let mut task_volumes = Vec::with_capacity(pod.spec.volumes.len());
    for volume in &pod.spec.volumes {
        match &volume.source {
            VolumeSource::EmptyDir {} => {}
            other => {
                return Err(reject(
                    pod,
                    format!(
                        "volume '{}' of type {} is not supported",
                        volume.name,
                        other.kind()
                    ),
                ))
            }
        }
        if !volume_names.insert(volume.name.as_str()) {
            return Err(reject(pod, format!("duplicate volume '{}'", volume.name)));
        }
        task_volumes.push(TaskVolume {
            name: volume.name.clone(),
        });
    }

    let family = family_name(&key);
    let mut seen = HashSet::new();
    let mut container_definitions = Vec::with_capacity(pod.spec.containers.len());
    let mut cpu_total: u64 = 0;
    let mut memory_total: u64 = 0;

    for container in &pod.spec.containers {
        if !seen.insert(container.name.as_str()) {
            return Err(reject(
                pod,
                format!("duplicate container name '{}'", container.name),
            ));
        }
        let sized = translate_container(pod, container, &family, ctx, &volume_names)?;
        cpu_total += sized.cpu_total as u64;
        memory_total = memory_total.saturating_add(sized.memory_total);
        container_definitions.push(sized.definition);
    }

    if cpu_total > MAX_TASK_CPU as u64 || memory_total > MAX_TASK_MEMORY_MIB {
        return Err(reject(
            pod,
            format!(
                "total resources ({} cpu, {}Mi) exceed the per-task ceiling ({} cpu, {}Mi)",
                cpu_total, memory_total, MAX_TASK_CPU, MAX_TASK_MEMORY_MIB
            ),
        ));
    }
    let (task_cpu, task_memory) =
        fargate_size(cpu_total as u32, memory_total).ok_or_else(|| {
            reject(
                pod,
                format!(
                    "no task size fits {} cpu and {}Mi",
                    cpu_total, memory_total
                ),
            )
        })?;

    let identity_tags = vec![
        Tag::new(TAG_NAMESPACE, pod.namespace()),
        Tag::new(TAG_NAME, pod.name()),
        Tag::new(TAG_UID, pod.uid()),
    ];

    let mut definition = TaskDefinition {
        family: family.clone(),
        execution_role_arn: Some(ctx.execution_role_arn.clone()),
        network_mode: "awsvpc".to_string(),
        requires_compatibilities: vec!["FARGATE".to_string()],
        cpu: task_cpu.to_string(),
        memory: task_memory.to_string(),
        container_definitions,
        volumes: task_volumes,
        tags: identity_tags.clone(),
    };
    let fingerprint = fingerprint(&definition)?;
    definition
        .tags
        .push(Tag::new(TAG_FINGERPRINT, fingerprint.clone()));

    let launch = RunTaskRequest {
        cluster: ctx.cluster.clone(),
        task_definition: family,
        launch_type: "FARGATE".to_string(),
        count: 1,
        network_configuration: NetworkConfiguration {
            awsvpc_configuration: AwsVpcConfiguration {
                subnets: ctx.subnets.clone(),
                security_groups: ctx.security_groups.clone(),
                assign_public_ip: if ctx.assign_public_ip {
                    "ENABLED".to_string()
                } else {
                    "DISABLED".to_string()
                },
            },
        },
        started_by: ctx.started_by.clone(),
        platform_version: ctx.platform_version.clone(),
        tags: identity_tags,
    };

    Ok(TaskPlan {
        definition,
        fingerprint,
        launch,
    })
}
