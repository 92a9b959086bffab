// ABOUTME: Deploys, inspects and tears down long-running applications.
// ABOUTME: Returns as soon as objects exist; the rollout after a build runs in the background.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::artifact::ArtifactResolver;
use crate::build::{BuildWatcher, WatchRegistry};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::platform::model::{BuildPhase, BuildRecord, WorkloadSummary};
use crate::platform::{BuildOps, FullPlatform};
use crate::request::{ArtifactRef, DeploymentRequest};
use crate::rollout::{CompletionHandler, RolloutCoordinator, RolloutOutcome, WorkloadRollout};
use crate::types::{AppId, BuildName, Selector};

use super::error::DeployError;
use super::pipeline::Pipeline;
use super::prepare::{ImageSource, prepare};
use super::steps::{
    BuildStep, ExposureStep, ImageStreamStep, WorkloadImage, WorkloadStep, base_container,
};
use super::teardown::{ScaleDown, ScaleDownWorker};

/// Result of a successful deploy call.
#[derive(Debug)]
pub struct Deployed {
    pub app_id: AppId,
    /// Build the rollout is waiting for, if any.
    pub build: Option<BuildName>,
    /// Background rollout; await it to block until the build has finished.
    pub rollout: Option<JoinHandle<RolloutOutcome>>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Default)]
pub struct Undeployed {
    pub workloads: usize,
    pub services: usize,
    pub routes: usize,
    pub pods: usize,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    /// Every workload has all replicas available.
    Deployed,
    Deploying,
    /// Workloads are waiting for a build that has not finished yet.
    Building,
    Failed,
    /// Some workloads are available, others are not.
    Partial,
    Undeployed,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    pub workload: String,
    pub replicas: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub app_id: String,
    pub state: DeploymentState,
    pub instances: Vec<InstanceStatus>,
    pub latest_build: Option<String>,
}

/// Open a watch for `app_id` and run a coordinator for `build` on its own task.
///
/// The task is registered under `key`, replacing any earlier watcher.
pub(crate) async fn spawn_coordinator<B, H>(
    builds: &B,
    watches: &WatchRegistry,
    key: &str,
    app_id: &AppId,
    build: BuildName,
    handler: H,
) -> Result<JoinHandle<RolloutOutcome>, DeployError>
where
    B: BuildOps + ?Sized,
    H: CompletionHandler + 'static,
{
    let subscription = BuildWatcher::subscribe(builds, app_id).await?;
    let coordinator = RolloutCoordinator::new(build, handler);
    let task = tokio::spawn(coordinator.run(subscription));
    watches.register(key, task.abort_handle());
    Ok(task)
}

/// Deploys applications as one or more long-running workloads.
pub struct AppDeployer<P: FullPlatform + 'static> {
    platform: Arc<P>,
    resolver: Arc<dyn ArtifactResolver>,
    config: Config,
    watches: WatchRegistry,
    scale_down: ScaleDownWorker,
}

impl<P: FullPlatform + 'static> AppDeployer<P> {
    /// Must be called inside a tokio runtime; starts the scale-down worker.
    pub fn new(platform: Arc<P>, resolver: Arc<dyn ArtifactResolver>, config: Config) -> Self {
        let scale_down = ScaleDownWorker::spawn(Arc::clone(&platform));
        Self {
            platform,
            resolver,
            config,
            watches: WatchRegistry::default(),
            scale_down,
        }
    }

    /// Whether a background rollout is still waiting on a build for `app_id`.
    pub fn is_watching(&self, app_id: &AppId) -> bool {
        self.watches.is_watching(app_id.as_str())
    }

    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<Deployed, DeployError> {
        request.app_name()?;
        let app_id = request.app_id()?;
        if request.create_route()? && request.create_node_port()? {
            return Err(DeployError::ConflictingExposure(app_id.to_string()));
        }
        // Malformed volume or resource properties fail before anything is created.
        base_container(request, &self.config.workload)?;

        let existing = self
            .platform
            .list_workloads(&Selector::app(&app_id))
            .await
            .map_err(DeployError::platform("workload lookup"))?;
        if !existing.is_empty() {
            return Err(DeployError::AlreadyDeployed(app_id.to_string()));
        }

        let prepared = prepare(
            self.platform.as_ref(),
            self.resolver.as_ref(),
            &self.config,
            request,
            &app_id,
        )
        .await?;
        let request = prepared.request;
        let mut diagnostics = Diagnostics::default();

        let tag = request.image_tag(&self.config.build.image_tag);
        let command = request
            .is_s2i_build()
            .then(|| vec![self.config.build.container_command.clone()]);
        let pending = WorkloadImage {
            initial: format!("{app_id}:{tag}"),
            config_change_trigger: false,
            rollout_to: None,
            command,
        };

        let mut pipeline = Pipeline::new();
        let mut awaited = None;
        let image = match prepared.source {
            ImageSource::Ready(image) if matches!(request.artifact(), ArtifactRef::Docker(_)) => {
                WorkloadImage {
                    initial: image.to_string(),
                    config_change_trigger: true,
                    ..pending
                }
            }
            ImageSource::Ready(image) => {
                pipeline = pipeline.step(ImageStreamStep::new(Arc::clone(&self.platform)));
                WorkloadImage {
                    initial: image.to_string(),
                    rollout_to: Some(image),
                    ..pending
                }
            }
            ImageSource::Build(plan) => {
                pipeline = pipeline
                    .step(ImageStreamStep::new(Arc::clone(&self.platform)))
                    .step(BuildStep::new(Arc::clone(&self.platform), *plan));
                pending
            }
            ImageSource::Pending(build) => {
                pipeline = pipeline.step(ImageStreamStep::new(Arc::clone(&self.platform)));
                awaited = Some(build);
                pending
            }
            ImageSource::Unresolved => {
                diagnostics.warn(Warning::build_unresolved(format!(
                    "{app_id}: rebuilding is disabled and no earlier build was found; \
                     workloads stay idle until an image is pushed to {}",
                    pending.initial
                )));
                pipeline = pipeline.step(ImageStreamStep::new(Arc::clone(&self.platform)));
                pending
            }
        };
        let pipeline = pipeline
            .step(WorkloadStep::new(
                Arc::clone(&self.platform),
                image,
                self.config.workload.clone(),
            ))
            .step(ExposureStep::new(Arc::clone(&self.platform)));

        tracing::info!(%app_id, steps = ?pipeline.step_names(), "deploying");
        if let Some(started) = pipeline.run(&request, &app_id).await? {
            tracing::info!(%app_id, build = %started.name, phase = %started.phase, "build started");
            awaited = Some(started.name);
        }

        let mut rollout = None;
        if let Some(build) = &awaited {
            let handler = WorkloadRollout::new(
                Arc::clone(&self.platform),
                request.clone(),
                app_id.clone(),
            );
            match spawn_coordinator(
                self.platform.as_ref(),
                &self.watches,
                app_id.as_str(),
                &app_id,
                build.clone(),
                handler,
            )
            .await
            {
                Ok(task) => rollout = Some(task),
                Err(e) => diagnostics.warn(Warning::watch_dropped(format!(
                    "{app_id}: could not watch build {build}, roll out manually once it completes: {e}"
                ))),
            }
        }

        Ok(Deployed {
            app_id,
            build: awaited,
            rollout,
            diagnostics,
        })
    }

    /// Scale every workload of `app_id` down, then delete its workloads, routes,
    /// services and any pods left behind.
    pub async fn undeploy(&self, app_id: &AppId) -> Result<Undeployed, DeployError> {
        if self.watches.cancel(app_id.as_str()) {
            tracing::debug!(%app_id, "stopped pending rollout");
        }

        let selector = Selector::app(app_id);
        let workloads = self
            .platform
            .list_workloads(&selector)
            .await
            .map_err(DeployError::platform("workload lookup"))?;
        if workloads.is_empty() {
            return Err(DeployError::NotDeployed(app_id.to_string()));
        }

        let mut diagnostics = Diagnostics::default();
        let timeout = self.config.teardown.scale_down_timeout;
        let results = join_all(
            workloads
                .iter()
                .map(|w| self.scale_down.scale_down(&w.name, timeout)),
        )
        .await;
        for (workload, result) in workloads.iter().zip(results) {
            match result {
                ScaleDown::Done => tracing::debug!(workload = %workload.name, "scaled down"),
                ScaleDown::TimedOut => diagnostics.warn(Warning::scale_down_timeout(format!(
                    "{} did not scale down within {timeout:?}",
                    workload.name
                ))),
                ScaleDown::Failed(e) => diagnostics.warn(Warning::scale_down_failed(format!(
                    "scaling down {} failed: {e}",
                    workload.name
                ))),
                ScaleDown::Stopped => diagnostics.warn(Warning::scale_down_failed(format!(
                    "scale-down worker stopped before {} was scaled down",
                    workload.name
                ))),
            }
        }

        for workload in &workloads {
            self.platform
                .delete_workload(&workload.name)
                .await
                .map_err(DeployError::platform("workload deletion"))?;
        }
        let routes = self
            .platform
            .delete_routes(&selector)
            .await
            .map_err(DeployError::platform("route deletion"))?;
        let services = self
            .platform
            .delete_services(&selector)
            .await
            .map_err(DeployError::platform("service deletion"))?;
        let pods = self.delete_pods(&selector).await?;
        tracing::info!(%app_id, workloads = workloads.len(), services, routes, pods, "undeployed");

        let delay = self.config.teardown.undeploy_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(Undeployed {
            workloads: workloads.len(),
            services,
            routes,
            pods,
            diagnostics,
        })
    }

    /// Pods outlive their workload while terminating; remove them explicitly.
    async fn delete_pods(&self, selector: &Selector) -> Result<usize, DeployError> {
        let pods = self
            .platform
            .list_pods(selector)
            .await
            .map_err(DeployError::platform("pod lookup"))?;
        for pod in &pods {
            tracing::debug!(pod = %pod.name, "deleting pod");
            self.platform
                .delete_pod(&pod.name)
                .await
                .map_err(DeployError::platform("pod deletion"))?;
        }
        Ok(pods.len())
    }

    pub async fn status(&self, app_id: &AppId) -> Result<AppStatus, DeployError> {
        let selector = Selector::app(app_id);
        let mut workloads = self
            .platform
            .list_workloads(&selector)
            .await
            .map_err(DeployError::platform("workload lookup"))?;
        workloads.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        let builds = self
            .platform
            .list_builds(&selector)
            .await
            .map_err(DeployError::platform("build lookup"))?;
        let latest = builds.into_iter().max_by_key(|b| b.created);

        Ok(AppStatus {
            app_id: app_id.to_string(),
            state: derive_state(&workloads, latest.as_ref()),
            instances: workloads
                .iter()
                .map(|w| InstanceStatus {
                    workload: w.name.to_string(),
                    replicas: w.replicas,
                    available: w.available_replicas,
                })
                .collect(),
            latest_build: latest.map(|b| b.name.into_inner()),
        })
    }

    /// Stop pending rollouts and wait for in-flight scale-downs.
    pub async fn shutdown(self) {
        self.watches.cancel_all();
        self.scale_down.shutdown().await;
    }
}

fn derive_state(workloads: &[WorkloadSummary], latest: Option<&BuildRecord>) -> DeploymentState {
    if workloads.is_empty() {
        return DeploymentState::Undeployed;
    }
    let ready = workloads
        .iter()
        .filter(|w| w.replicas > 0 && w.available_replicas >= w.replicas)
        .count();
    if ready == workloads.len() {
        return DeploymentState::Deployed;
    }
    if ready > 0 {
        return DeploymentState::Partial;
    }
    match latest.map(|b| b.phase) {
        Some(BuildPhase::Failed | BuildPhase::Error | BuildPhase::Cancelled) => {
            DeploymentState::Failed
        }
        Some(phase) if !phase.is_terminal() => DeploymentState::Building,
        _ => DeploymentState::Deploying,
    }
}
