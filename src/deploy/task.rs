// ABOUTME: Launches one-shot tasks as pods, building their image first when needed.
// ABOUTME: A task whose image still has to be built starts from the build completion handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::artifact::ArtifactResolver;
use crate::build::WatchRegistry;
use crate::config::{Config, WorkloadDefaults};
use crate::platform::model::{ContainerSpec, PodPhase, PodSpec};
use crate::platform::{FullPlatform, PodOps};
use crate::request::{ArtifactRef, DeploymentRequest, keys};
use crate::rollout::{ImageLauncher, RolloutError, RolloutOutcome, TaskLaunch};
use crate::types::{BuildName, Labels, PodName};

use super::app::spawn_coordinator;
use super::error::DeployError;
use super::pipeline::Pipeline;
use super::prepare::{ImageSource, prepare};
use super::steps::{BuildStep, ImageStreamStep, base_container};

/// Label carrying the task id on task pods.
pub const TASK_ID_LABEL: &str = "kiln-task-id";

/// Result of a launch call.
#[derive(Debug)]
pub struct Launched {
    pub task_id: PodName,
    pub build: Option<BuildName>,
    /// Present when the pod starts only after a build completes.
    pub launch: Option<JoinHandle<RolloutOutcome>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its image or for the pod to be scheduled.
    Launching,
    Running,
    Succeeded,
    Failed,
    Unknown,
    NotFound,
}

/// Creates the pod for a task request that already points at an image.
pub struct PodLauncher<P: ?Sized> {
    pods: Arc<P>,
    container_command: String,
    defaults: WorkloadDefaults,
}

impl<P: PodOps + ?Sized> PodLauncher<P> {
    pub fn new(
        pods: Arc<P>,
        container_command: impl Into<String>,
        defaults: WorkloadDefaults,
    ) -> Self {
        Self {
            pods,
            container_command: container_command.into(),
            defaults,
        }
    }
}

#[async_trait]
impl<P: PodOps + ?Sized> ImageLauncher for PodLauncher<P> {
    async fn launch_image(&self, request: DeploymentRequest) -> Result<(), RolloutError> {
        let ArtifactRef::Docker(image) = request.artifact() else {
            return Err(RolloutError::Launch(format!(
                "{} is not an image reference",
                request.artifact()
            )));
        };
        let task_id = request
            .deployment_property(keys::TASK_ID)
            .ok_or_else(|| RolloutError::Launch("request carries no task id".to_string()))?;
        let app_id = request.app_id()?;

        let task_label = BTreeMap::from([(TASK_ID_LABEL.to_string(), task_id.to_string())]);
        let labels = Labels::for_app(&app_id)
            .merge(&Labels::from(task_label))
            .merge(&request.labels()?);

        let spec = PodSpec {
            name: PodName::new(task_id),
            labels,
            container: ContainerSpec {
                image: image.to_string(),
                command: request
                    .is_s2i_build()
                    .then(|| vec![self.container_command.clone()]),
                ..base_container(&request, &self.defaults)?
            },
        };
        self.pods
            .create_pod(&spec)
            .await
            .map_err(|e| RolloutError::Launch(format!("creating pod {task_id}: {e}")))?;
        tracing::info!(%app_id, task_id, %image, "task launched");
        Ok(())
    }
}

/// Launches tasks and tracks the builds they wait for.
pub struct TaskLauncher<P: FullPlatform + 'static> {
    platform: Arc<P>,
    pods: Arc<PodLauncher<P>>,
    resolver: Arc<dyn ArtifactResolver>,
    config: Config,
    watches: WatchRegistry,
}

impl<P: FullPlatform + 'static> TaskLauncher<P> {
    pub fn new(platform: Arc<P>, resolver: Arc<dyn ArtifactResolver>, config: Config) -> Self {
        let pods = Arc::new(PodLauncher::new(
            Arc::clone(&platform),
            config.build.container_command.clone(),
            config.workload.clone(),
        ));
        Self {
            platform,
            pods,
            resolver,
            config,
            watches: WatchRegistry::default(),
        }
    }

    pub fn is_watching(&self, task_id: &PodName) -> bool {
        self.watches.is_watching(task_id.as_str())
    }

    pub async fn launch(&self, request: &DeploymentRequest) -> Result<Launched, DeployError> {
        request.app_name()?;
        let app_id = request.app_id()?;
        base_container(request, &self.config.workload)?;
        let task_id = PodName::new(format!(
            "{app_id}-{}",
            Utc::now().format("%Y%m%d%H%M%S%3f")
        ));
        let request = request.with_deployment_property(keys::TASK_ID, task_id.as_str());

        let prepared = prepare(
            self.platform.as_ref(),
            self.resolver.as_ref(),
            &self.config,
            &request,
            &app_id,
        )
        .await?;
        let request = prepared.request;

        let build = match prepared.source {
            ImageSource::Ready(image) => {
                self.pods
                    .launch_image(request.with_artifact(ArtifactRef::Docker(image)))
                    .await?;
                return Ok(Launched {
                    task_id,
                    build: None,
                    launch: None,
                });
            }
            ImageSource::Build(plan) => {
                let pipeline = Pipeline::new()
                    .step(ImageStreamStep::new(Arc::clone(&self.platform)))
                    .step(BuildStep::new(Arc::clone(&self.platform), *plan));
                let started = pipeline.run(&request, &app_id).await?;
                started
                    .map(|record| record.name)
                    .ok_or_else(|| DeployError::NoImage(app_id.to_string()))?
            }
            ImageSource::Pending(build) => build,
            ImageSource::Unresolved => return Err(DeployError::NoImage(app_id.to_string())),
        };

        tracing::info!(%app_id, task_id = %task_id, %build, "task waits for build");
        let handler = TaskLaunch::new(Arc::clone(&self.pods), request);
        let launch = spawn_coordinator(
            self.platform.as_ref(),
            &self.watches,
            task_id.as_str(),
            &app_id,
            build.clone(),
            handler,
        )
        .await?;

        Ok(Launched {
            task_id,
            build: Some(build),
            launch: Some(launch),
        })
    }

    pub async fn status(&self, task_id: &PodName) -> Result<TaskStatus, DeployError> {
        let pod = self
            .platform
            .get_pod(task_id)
            .await
            .map_err(DeployError::platform("pod lookup"))?;
        Ok(match pod {
            None if self.is_watching(task_id) => TaskStatus::Launching,
            None => TaskStatus::NotFound,
            Some(pod) => match pod.phase {
                PodPhase::Pending => TaskStatus::Launching,
                PodPhase::Running => TaskStatus::Running,
                PodPhase::Succeeded => TaskStatus::Succeeded,
                PodPhase::Failed => TaskStatus::Failed,
                PodPhase::Unknown => TaskStatus::Unknown,
            },
        })
    }

    /// Stop waiting for the task's build and delete its pod.
    pub async fn cleanup(&self, task_id: &PodName) -> Result<(), DeployError> {
        if self.watches.cancel(task_id.as_str()) {
            tracing::debug!(task_id = %task_id, "stopped pending launch");
        }
        self.platform
            .delete_pod(task_id)
            .await
            .map_err(DeployError::platform("pod deletion"))?;
        tracing::info!(task_id = %task_id, "task cleaned up");
        Ok(())
    }

    pub fn shutdown(self) {
        self.watches.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;
    use crate::platform::model::PodSummary;
    use crate::request::AppDefinition;
    use crate::types::{ImageRef, Selector};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPods {
        created: Mutex<Vec<PodSpec>>,
    }

    #[async_trait]
    impl PodOps for RecordingPods {
        async fn create_pod(&self, spec: &PodSpec) -> Result<(), PlatformError> {
            self.created.lock().push(spec.clone());
            Ok(())
        }

        async fn get_pod(&self, _: &PodName) -> Result<Option<PodSummary>, PlatformError> {
            Ok(None)
        }

        async fn list_pods(&self, _: &Selector) -> Result<Vec<PodSummary>, PlatformError> {
            Ok(Vec::new())
        }

        async fn delete_pod(&self, _: &PodName) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn task_request() -> DeploymentRequest {
        DeploymentRequest::new(
            AppDefinition::new("report").with_property("batch.size", "50"),
            ArtifactRef::Docker(ImageRef::parse("registry/report:abc123").unwrap()),
        )
        .with_deployment_property(keys::TASK_ID, "report-20261016120000000")
    }

    #[tokio::test]
    async fn binary_built_tasks_run_the_builder_command() {
        let pods = Arc::new(RecordingPods::default());
        let launcher = PodLauncher::new(
            Arc::clone(&pods),
            "/usr/local/s2i/run",
            WorkloadDefaults::default(),
        );
        let request = task_request().with_deployment_property(keys::S2I_BUILD_MARKER, "true");

        launcher.launch_image(request).await.unwrap();

        let created = pods.created.lock();
        assert_eq!(created.len(), 1);
        let pod = &created[0];
        assert_eq!(pod.name, "report-20261016120000000");
        assert_eq!(pod.labels.get(TASK_ID_LABEL), Some("report-20261016120000000"));
        assert_eq!(pod.container.image, "registry/report:abc123");
        assert_eq!(
            pod.container.command,
            Some(vec!["/usr/local/s2i/run".to_string()])
        );
        assert_eq!(pod.container.args, vec!["--batch.size=50".to_string()]);
    }

    #[tokio::test]
    async fn task_pods_get_resources_and_volumes() {
        let pods = Arc::new(RecordingPods::default());
        let mut defaults = WorkloadDefaults::default();
        defaults.resources.limits.memory = Some("256Mi".into());
        let launcher = PodLauncher::new(Arc::clone(&pods), "/usr/local/s2i/run", defaults);
        let request = task_request()
            .with_deployment_property(keys::VOLUMES, "[{name: scratch, emptyDir: {}}]")
            .with_deployment_property(keys::VOLUME_MOUNTS, "[{name: scratch, mountPath: /tmp/work}]")
            .with_deployment_property(keys::REQUESTS_CPU, "100m");

        launcher.launch_image(request).await.unwrap();

        let created = pods.created.lock();
        let container = &created[0].container;
        assert_eq!(container.volumes[0].name, "scratch");
        assert_eq!(container.volume_mounts[0].mount_path, "/tmp/work");
        assert_eq!(container.resources.limits.memory.as_deref(), Some("256Mi"));
        assert_eq!(container.resources.requests.cpu.as_deref(), Some("100m"));
        assert_eq!(container.port, None);
    }

    #[tokio::test]
    async fn launch_needs_an_image() {
        let pods = Arc::new(RecordingPods::default());
        let launcher = PodLauncher::new(
            Arc::clone(&pods),
            "/usr/local/s2i/run",
            WorkloadDefaults::default(),
        );
        let request = task_request()
            .with_artifact(ArtifactRef::parse("target/report.jar").unwrap());

        let err = launcher.launch_image(request).await.unwrap_err();
        assert!(matches!(err, RolloutError::Launch(_)));
        assert!(pods.created.lock().is_empty());
    }
}
