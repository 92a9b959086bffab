// ABOUTME: Platform object descriptions passed through the capability traits.
// ABOUTME: Build configs, build runs, workloads, services, routes and task pods.

use crate::artifact::ArtifactFingerprint;
use crate::types::{BuildName, ImageRef, Labels, PodName, WorkloadName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Environment variable carrying the artifact fingerprint on every build.
pub const FINGERPRINT_ENV: &str = "kiln_build_id";

/// Environment variable carrying the instance index on indexed workloads.
pub const INSTANCE_INDEX_ENV: &str = "INSTANCE_INDEX";

/// Where a build takes its source from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSource {
    Git {
        uri: String,
        git_ref: String,
        context_dir: Option<String>,
        secret: Option<String>,
    },
    /// Dockerfile text supplied inline.
    Dockerfile(String),
    /// Content uploaded when the build is instantiated.
    Binary,
}

/// How a build turns its source into an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStrategyKind {
    Docker { dockerfile_path: Option<String> },
    Source { builder: ImageRef },
}

/// Create-or-replace description of a build pipeline object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfigSpec {
    pub name: String,
    pub labels: Labels,
    pub source: BuildSource,
    pub strategy: BuildStrategyKind,
    /// Strategy environment, inherited by every build of this config.
    pub env: BTreeMap<String, String>,
    /// Output `ImageStreamTag` name, `{appId}:{tag}`.
    pub output: String,
}

/// Parameters for one templated build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequestSpec {
    pub env: BTreeMap<String, String>,
}

/// Build lifecycle phase as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    New,
    Pending,
    Running,
    Complete,
    Failed,
    Error,
    Cancelled,
}

impl BuildPhase {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "New" => BuildPhase::New,
            "Pending" => BuildPhase::Pending,
            "Running" => BuildPhase::Running,
            "Complete" => BuildPhase::Complete,
            "Failed" => BuildPhase::Failed,
            "Error" => BuildPhase::Error,
            "Cancelled" => BuildPhase::Cancelled,
            _ => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildPhase::Complete | BuildPhase::Failed | BuildPhase::Error | BuildPhase::Cancelled
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One observed build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub name: BuildName,
    pub app_id: Option<String>,
    pub fingerprint: Option<ArtifactFingerprint>,
    pub phase: BuildPhase,
    /// Pushed image, present once the build is Complete.
    pub output_image: Option<ImageRef>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStreamSpec {
    pub name: String,
    pub labels: Labels,
}

/// A pod volume. `source` holds the volume source exactly as the API
/// expects it, e.g. `persistentVolumeClaim: {claimName: data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    #[serde(flatten)]
    pub source: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeMountSpec {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// Cpu and memory quantities, e.g. `500m` and `512Mi`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ComputeResources {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }

    /// Fields set in `other` replace ours.
    pub fn overridden_by(&self, other: &ComputeResources) -> ComputeResources {
        ComputeResources {
            cpu: other.cpu.clone().or_else(|| self.cpu.clone()),
            memory: other.memory.clone().or_else(|| self.memory.clone()),
        }
    }

    /// First value that is not a valid quantity.
    pub fn invalid_quantity(&self) -> Option<&str> {
        [self.cpu.as_deref(), self.memory.as_deref()]
            .into_iter()
            .flatten()
            .find(|value| !is_quantity(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    #[serde(default)]
    pub limits: ComputeResources,
    #[serde(default)]
    pub requests: ComputeResources,
}

impl ResourceSpec {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }

    pub fn overridden_by(&self, other: &ResourceSpec) -> ResourceSpec {
        ResourceSpec {
            limits: self.limits.overridden_by(&other.limits),
            requests: self.requests.overridden_by(&other.requests),
        }
    }

    pub fn invalid_quantity(&self) -> Option<&str> {
        self.limits
            .invalid_quantity()
            .or_else(|| self.requests.invalid_quantity())
    }
}

/// Whether `value` is a resource quantity: a decimal number with an
/// optional decimal (`m`, `k`, `M`, `G`, ...) or binary (`Ki`, `Mi`, ...) suffix.
pub fn is_quantity(value: &str) -> bool {
    const SUFFIXES: [&str; 13] = [
        "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "m", "k", "M", "G", "T", "P", "E",
    ];
    let number = SUFFIXES
        .iter()
        .find_map(|suffix| value.strip_suffix(suffix))
        .unwrap_or(value);
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Option<Vec<String>>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub port: Option<u16>,
    pub volume_mounts: Vec<VolumeMountSpec>,
    /// Pod volumes backing `volume_mounts`.
    pub volumes: Vec<VolumeSpec>,
    pub resources: ResourceSpec,
}

/// Create-or-replace description of a long-running workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub name: WorkloadName,
    pub labels: Labels,
    pub replicas: u32,
    pub container: ContainerSpec,
    /// Roll out automatically whenever the spec changes.
    pub config_change_trigger: bool,
}

/// Point a workload at a new image and start a new rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutRequest {
    pub name: WorkloadName,
    pub image: ImageRef,
    pub instance_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSummary {
    pub name: WorkloadName,
    pub replicas: u32,
    pub available_replicas: u32,
    pub latest_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub labels: Labels,
    pub selector: BTreeMap<String, String>,
    pub port: u16,
    pub node_port: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub name: String,
    pub labels: Labels,
    pub service: String,
    pub port: u16,
}

/// A run-to-completion pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSpec {
    pub name: PodName,
    pub labels: Labels,
    pub container: ContainerSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
    pub name: PodName,
    pub phase: PodPhase,
    pub labels: BTreeMap<String, String>,
}
