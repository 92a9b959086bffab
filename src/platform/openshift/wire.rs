// ABOUTME: Serde shapes for the parts of OpenShift objects kiln reads.
// ABOUTME: Converts builds, deployment configs and pods into platform model records.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::artifact::ArtifactFingerprint;
use crate::platform::error::PlatformError;
use crate::platform::model::{
    BuildPhase, BuildRecord, FINGERPRINT_ENV, PodPhase, PodSummary, WorkloadSummary,
};
use crate::types::{APP_ID_LABEL, BuildName, ImageRef, PodName, WorkloadName};

/// Read a dynamic object as one of the typed shapes below.
pub(crate) fn decode<T: DeserializeOwned>(object: DynamicObject) -> Result<T, PlatformError> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StrategyEnv {
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildStrategy {
    #[serde(default)]
    pub docker_strategy: Option<StrategyEnv>,
    #[serde(default)]
    pub source_strategy: Option<StrategyEnv>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BuildSpec {
    #[serde(default)]
    pub strategy: BuildStrategy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildStatus {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub output_docker_image_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Build {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BuildSpec,
    #[serde(default)]
    pub status: BuildStatus,
}

impl From<Build> for BuildRecord {
    fn from(build: Build) -> Self {
        let phase = match build.status.phase.as_deref() {
            None => BuildPhase::New,
            Some(raw) => BuildPhase::parse(raw).unwrap_or_else(|| {
                tracing::debug!(build = %build.metadata.name, phase = raw, "unrecognised build phase");
                BuildPhase::New
            }),
        };
        let strategy = build.spec.strategy;
        let fingerprint = strategy
            .docker_strategy
            .iter()
            .chain(strategy.source_strategy.iter())
            .flat_map(|s| s.env.iter())
            .find(|var| var.name == FINGERPRINT_ENV)
            .and_then(|var| var.value.clone())
            .map(ArtifactFingerprint::from_hex);
        let output_image = if phase == BuildPhase::Complete {
            build
                .status
                .output_docker_image_reference
                .as_deref()
                .and_then(|r| ImageRef::parse(r).ok())
        } else {
            None
        };
        BuildRecord {
            app_id: build.metadata.labels.get(APP_ID_LABEL).cloned(),
            name: BuildName::new(build.metadata.name),
            fingerprint,
            phase,
            output_image,
            created: build.metadata.creation_timestamp,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeploymentConfigSpec {
    #[serde(default)]
    pub replicas: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentConfigStatus {
    #[serde(default)]
    pub available_replicas: u32,
    #[serde(default)]
    pub latest_version: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeploymentConfig {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DeploymentConfigSpec,
    #[serde(default)]
    pub status: DeploymentConfigStatus,
}

impl From<DeploymentConfig> for WorkloadSummary {
    fn from(dc: DeploymentConfig) -> Self {
        WorkloadSummary {
            name: WorkloadName::new(dc.metadata.name),
            replicas: dc.spec.replicas,
            available_replicas: dc.status.available_replicas,
            latest_version: dc.status.latest_version,
        }
    }
}

impl From<Pod> for PodSummary {
    fn from(pod: Pod) -> Self {
        let name = PodName::new(pod.name_any());
        let phase = pod
            .status
            .and_then(|status| status.phase)
            .unwrap_or_default();
        PodSummary {
            name,
            phase: PodPhase::parse(&phase),
            labels: pod.metadata.labels.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_build_carries_fingerprint_and_image() {
        let json = serde_json::json!({
            "metadata": {
                "name": "ticker-3",
                "labels": {"kiln-app-id": "ticker"},
                "creationTimestamp": "2024-05-01T10:00:00Z"
            },
            "spec": {"strategy": {"sourceStrategy": {"env": [
                {"name": "kiln_build_id", "value": "abc123"},
                {"name": "app_name", "value": "ticker"}
            ]}}},
            "status": {
                "phase": "Complete",
                "outputDockerImageReference": "172.30.1.1:5000/streams/ticker:latest"
            }
        });
        let record: BuildRecord = serde_json::from_value::<Build>(json).unwrap().into();
        assert_eq!(record.name, "ticker-3");
        assert_eq!(record.app_id.as_deref(), Some("ticker"));
        assert_eq!(record.fingerprint.unwrap().as_str(), "abc123");
        assert_eq!(record.phase, BuildPhase::Complete);
        assert_eq!(
            record.output_image.unwrap().to_string(),
            "172.30.1.1:5000/streams/ticker:latest"
        );
        assert!(record.created.is_some());
    }

    #[test]
    fn running_build_has_no_output_image() {
        let json = serde_json::json!({
            "metadata": {"name": "ticker-4"},
            "spec": {"strategy": {"dockerStrategy": {}}},
            "status": {"phase": "Running", "outputDockerImageReference": "x/ticker:latest"}
        });
        let record: BuildRecord = serde_json::from_value::<Build>(json).unwrap().into();
        assert_eq!(record.phase, BuildPhase::Running);
        assert_eq!(record.output_image, None);
        assert_eq!(record.fingerprint, None);
    }

    #[test]
    fn deployment_config_summary() {
        let json = serde_json::json!({
            "metadata": {"name": "ticker-0"},
            "spec": {"replicas": 1},
            "status": {"availableReplicas": 1, "latestVersion": 2}
        });
        let summary: WorkloadSummary =
            serde_json::from_value::<DeploymentConfig>(json).unwrap().into();
        assert_eq!(summary.name, "ticker-0");
        assert_eq!(summary.latest_version, 2);
    }

    #[test]
    fn dynamic_build_objects_decode() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "build.openshift.io/v1",
            "kind": "Build",
            "metadata": {"name": "ticker-5", "labels": {"kiln-app-id": "ticker"}},
            "status": {"phase": "Pending"}
        }))
        .unwrap();
        let record: BuildRecord = decode::<Build>(object).unwrap().into();
        assert_eq!(record.name, "ticker-5");
        assert_eq!(record.phase, BuildPhase::Pending);
    }

    #[test]
    fn pod_summary_reads_phase_and_labels() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "metadata": {"name": "report-1a2b", "labels": {"kiln-task-id": "report-1a2b"}},
            "status": {"phase": "Succeeded"}
        }))
        .unwrap();
        let summary = PodSummary::from(pod);
        assert_eq!(summary.name, "report-1a2b");
        assert_eq!(summary.phase, PodPhase::Succeeded);
        assert_eq!(summary.labels.len(), 1);
    }
}
