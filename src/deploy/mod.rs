// ABOUTME: Application deployment and task launching on top of the build pipeline.
// ABOUTME: Exports the deployer, the task launcher and the object pipeline they share.

mod app;
mod error;
mod pipeline;
mod prepare;
mod steps;
mod task;
mod teardown;

pub use app::{AppDeployer, AppStatus, Deployed, DeploymentState, InstanceStatus, Undeployed};
pub use error::{DeployError, DeployErrorKind};
pub use pipeline::{ObjectFactoryStep, Pipeline};
pub use steps::{BuildStep, ExposureStep, ImageStreamStep, WorkloadImage, WorkloadStep};
pub use task::{Launched, PodLauncher, TASK_ID_LABEL, TaskLauncher, TaskStatus};
pub use teardown::{ScaleDown, ScaleDownWorker};
