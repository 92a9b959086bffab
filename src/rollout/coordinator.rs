// ABOUTME: Reacts to build lifecycle events and triggers the rollout once the build completes.
// ABOUTME: Two states, Awaiting and Done; the completion handler runs at most once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::build::{WatchItem, WatchSubscription};
use crate::platform::WorkloadOps;
use crate::platform::model::{BuildPhase, BuildRecord};
use crate::request::{ArtifactRef, DeploymentRequest};
use crate::types::{AppId, BuildName, ImageRef};

use super::error::RolloutError;
use super::fanout::{rollout_all, targets};

/// What to do with the image of a completed build.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn on_build_complete(&self, image: &ImageRef) -> Result<(), RolloutError>;
}

/// Launches a one-shot task from a built image.
#[async_trait]
pub trait ImageLauncher: Send + Sync {
    async fn launch_image(&self, request: DeploymentRequest) -> Result<(), RolloutError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Awaiting,
    Done,
}

/// How watching a build ended.
#[derive(Debug)]
pub enum RolloutOutcome {
    RolledOut { build: BuildName, image: ImageRef },
    RolloutFailed { build: BuildName, error: RolloutError },
    BuildFailed { build: BuildName, phase: BuildPhase },
    WatchDropped(String),
}

impl RolloutOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RolloutOutcome::RolledOut { .. })
    }
}

pub struct RolloutCoordinator<H> {
    build: BuildName,
    handler: H,
    state: CoordinatorState,
}

impl<H: CompletionHandler> RolloutCoordinator<H> {
    /// Coordinate the rollout of `build`. Records of other builds are ignored.
    pub fn new(build: BuildName, handler: H) -> Self {
        Self {
            build,
            handler,
            state: CoordinatorState::Awaiting,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Feed one record. Returns an outcome once the build reached a terminal phase.
    pub async fn observe(&mut self, record: &BuildRecord) -> Option<RolloutOutcome> {
        if self.state == CoordinatorState::Done || record.name != self.build {
            return None;
        }
        match record.phase {
            BuildPhase::Complete => {
                self.state = CoordinatorState::Done;
                let build = self.build.clone();
                let Some(image) = record.output_image.clone() else {
                    return Some(RolloutOutcome::RolloutFailed {
                        error: RolloutError::NoImage(build.clone()),
                        build,
                    });
                };
                tracing::info!(%build, %image, "build complete, rolling out");
                Some(match self.handler.on_build_complete(&image).await {
                    Ok(()) => RolloutOutcome::RolledOut { build, image },
                    Err(error) => RolloutOutcome::RolloutFailed { build, error },
                })
            }
            phase if phase.is_terminal() => {
                tracing::warn!(build = %self.build, %phase, "build did not complete");
                Some(RolloutOutcome::BuildFailed {
                    build: self.build.clone(),
                    phase,
                })
            }
            phase => {
                tracing::debug!(build = %self.build, %phase, "build progressing");
                None
            }
        }
    }

    /// Consume events until the build finishes or the watch drops.
    ///
    /// The subscription is closed right after the first completion.
    pub async fn run(mut self, mut subscription: WatchSubscription) -> RolloutOutcome {
        while let Some(item) = subscription.next().await {
            match item {
                WatchItem::Event(record) => {
                    if let Some(outcome) = self.observe(&record).await {
                        if self.state == CoordinatorState::Done {
                            subscription.close();
                        }
                        return outcome;
                    }
                }
                WatchItem::Dropped(reason) => {
                    tracing::warn!(build = %self.build, %reason, "build watch dropped");
                    return RolloutOutcome::WatchDropped(reason);
                }
            }
        }
        RolloutOutcome::WatchDropped("watch ended".to_string())
    }
}

/// Rolls the application's workloads out to the built image.
pub struct WorkloadRollout<W: ?Sized> {
    workloads: Arc<W>,
    request: DeploymentRequest,
    app_id: AppId,
}

impl<W: WorkloadOps + ?Sized> WorkloadRollout<W> {
    pub fn new(workloads: Arc<W>, request: DeploymentRequest, app_id: AppId) -> Self {
        Self {
            workloads,
            request,
            app_id,
        }
    }
}

#[async_trait]
impl<W: WorkloadOps + ?Sized> CompletionHandler for WorkloadRollout<W> {
    async fn on_build_complete(&self, image: &ImageRef) -> Result<(), RolloutError> {
        // Topology is read again here rather than carried over from creation.
        let targets = targets(
            &self.app_id,
            self.request.indexed()?,
            self.request.count()?,
        );
        let triggered = rollout_all(self.workloads.as_ref(), &targets, image).await?;
        tracing::info!(app_id = %self.app_id, triggered, "rollout triggered");
        Ok(())
    }
}

/// Launches the task request again, pointing at the built image.
pub struct TaskLaunch<L: ?Sized> {
    launcher: Arc<L>,
    request: DeploymentRequest,
}

impl<L: ImageLauncher + ?Sized> TaskLaunch<L> {
    pub fn new(launcher: Arc<L>, request: DeploymentRequest) -> Self {
        Self { launcher, request }
    }
}

#[async_trait]
impl<L: ImageLauncher + ?Sized> CompletionHandler for TaskLaunch<L> {
    async fn on_build_complete(&self, image: &ImageRef) -> Result<(), RolloutError> {
        let request = self
            .request
            .with_artifact(ArtifactRef::Docker(image.clone()));
        self.launcher.launch_image(request).await
    }
}
