// ABOUTME: Pipeline steps for image streams, builds, workloads and network exposure.
// ABOUTME: Each step creates or replaces its objects on ensure; builds start on activate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::build::{BuildPlan, ensure_build_config, start_build};
use crate::config::WorkloadDefaults;
use crate::platform::model::{
    BuildRecord, ContainerSpec, INSTANCE_INDEX_ENV, ImageStreamSpec, RouteSpec, ServiceSpec,
    WorkloadSpec,
};
use crate::platform::{BuildOps, ExposureOps, ImageStreamOps, WorkloadOps};
use crate::request::{DeploymentRequest, RequestError};
use crate::rollout::{rollout_all, targets};
use crate::types::{APP_ID_LABEL, AppId, DEPLOYMENT_ID_LABEL, ImageRef, Labels};

use super::error::DeployError;
use super::pipeline::ObjectFactoryStep;

/// Labels for every object of `id`: identity first, then the request's own.
pub(crate) fn object_labels(request: &DeploymentRequest, id: &AppId) -> Result<Labels, DeployError> {
    Ok(Labels::for_app(id).merge(&request.labels()?))
}

/// Application properties become `--key=value` arguments ahead of explicit ones.
pub(crate) fn container_args(request: &DeploymentRequest) -> Vec<String> {
    request
        .definition()
        .properties
        .iter()
        .filter(|(key, _)| !key.starts_with("kiln."))
        .map(|(key, value)| format!("--{key}={value}"))
        .chain(request.args().iter().cloned())
        .collect()
}

/// Arguments, volumes, mounts and resources of a request's container.
///
/// Request volumes and mounts replace configured ones of the same name and
/// request resources replace configured ones field by field. Volumes nothing
/// mounts are left out.
pub(crate) fn base_container(
    request: &DeploymentRequest,
    defaults: &WorkloadDefaults,
) -> Result<ContainerSpec, RequestError> {
    let mut volumes = request.volumes()?;
    let inherited: Vec<_> = defaults
        .volumes
        .iter()
        .filter(|d| !volumes.iter().any(|v| v.name == d.name))
        .cloned()
        .collect();
    volumes.extend(inherited);

    let mut volume_mounts = request.volume_mounts()?;
    let inherited: Vec<_> = defaults
        .volume_mounts
        .iter()
        .filter(|d| !volume_mounts.iter().any(|m| m.name == d.name))
        .cloned()
        .collect();
    volume_mounts.extend(inherited);

    volumes.retain(|v| volume_mounts.iter().any(|m| m.name == v.name));

    Ok(ContainerSpec {
        args: container_args(request),
        volume_mounts,
        volumes,
        resources: defaults.resources.overridden_by(&request.resources()?),
        ..ContainerSpec::default()
    })
}

pub struct ImageStreamStep<P: ?Sized> {
    platform: Arc<P>,
}

impl<P: ImageStreamOps + ?Sized> ImageStreamStep<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl<P: ImageStreamOps + ?Sized> ObjectFactoryStep for ImageStreamStep<P> {
    fn name(&self) -> &'static str {
        "image stream"
    }

    async fn ensure(&self, request: &DeploymentRequest, id: &AppId) -> Result<(), DeployError> {
        let spec = ImageStreamSpec {
            name: id.to_string(),
            labels: object_labels(request, id)?,
        };
        self.platform
            .ensure_image_stream(&spec)
            .await
            .map_err(DeployError::platform(self.name()))
    }
}

pub struct BuildStep<P: ?Sized> {
    platform: Arc<P>,
    plan: BuildPlan,
}

impl<P: BuildOps + ?Sized> BuildStep<P> {
    pub fn new(platform: Arc<P>, plan: BuildPlan) -> Self {
        Self { platform, plan }
    }
}

#[async_trait]
impl<P: BuildOps + ?Sized> ObjectFactoryStep for BuildStep<P> {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn ensure(&self, _: &DeploymentRequest, _: &AppId) -> Result<(), DeployError> {
        Ok(ensure_build_config(self.platform.as_ref(), &self.plan).await?)
    }

    async fn activate(
        &self,
        request: &DeploymentRequest,
        _: &AppId,
    ) -> Result<Option<BuildRecord>, DeployError> {
        let record = start_build(self.platform.as_ref(), request, &self.plan).await?;
        Ok(Some(record))
    }
}

/// How workloads get their image.
#[derive(Debug, Clone)]
pub struct WorkloadImage {
    /// Image the workload objects are created with.
    pub initial: String,
    /// Roll out automatically on every spec change.
    pub config_change_trigger: bool,
    /// Image to roll out on activation, when it is already known.
    pub rollout_to: Option<ImageRef>,
    pub command: Option<Vec<String>>,
}

pub struct WorkloadStep<P: ?Sized> {
    platform: Arc<P>,
    image: WorkloadImage,
    defaults: WorkloadDefaults,
}

impl<P: WorkloadOps + ?Sized> WorkloadStep<P> {
    pub fn new(platform: Arc<P>, image: WorkloadImage, defaults: WorkloadDefaults) -> Self {
        Self {
            platform,
            image,
            defaults,
        }
    }
}

#[async_trait]
impl<P: WorkloadOps + ?Sized> ObjectFactoryStep for WorkloadStep<P> {
    fn name(&self) -> &'static str {
        "workload"
    }

    async fn ensure(&self, request: &DeploymentRequest, id: &AppId) -> Result<(), DeployError> {
        let indexed = request.indexed()?;
        let count = request.count()?;
        let labels = object_labels(request, id)?;
        let port = request.port()?;
        let base = base_container(request, &self.defaults)?;

        for target in targets(id, indexed, count) {
            let mut env = std::collections::BTreeMap::new();
            if let Some(index) = target.instance_index {
                env.insert(INSTANCE_INDEX_ENV.to_string(), index.to_string());
            }
            let spec = WorkloadSpec {
                labels: Labels::for_workload(id, target.workload.as_str()).merge(&labels),
                replicas: if indexed { 1 } else { count },
                container: ContainerSpec {
                    image: self.image.initial.clone(),
                    command: self.image.command.clone(),
                    env,
                    port: Some(port),
                    ..base.clone()
                },
                config_change_trigger: self.image.config_change_trigger,
                name: target.workload,
            };
            self.platform
                .apply_workload(&spec)
                .await
                .map_err(DeployError::platform(self.name()))?;
        }
        Ok(())
    }

    async fn activate(
        &self,
        request: &DeploymentRequest,
        id: &AppId,
    ) -> Result<Option<BuildRecord>, DeployError> {
        if let Some(image) = &self.image.rollout_to {
            let targets = targets(id, request.indexed()?, request.count()?);
            rollout_all(self.platform.as_ref(), &targets, image).await?;
        }
        Ok(None)
    }
}

pub struct ExposureStep<P: ?Sized> {
    platform: Arc<P>,
}

impl<P: ExposureOps + ?Sized> ExposureStep<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl<P: ExposureOps + ?Sized> ObjectFactoryStep for ExposureStep<P> {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn ensure(&self, request: &DeploymentRequest, id: &AppId) -> Result<(), DeployError> {
        let labels = object_labels(request, id)?;
        let port = request.port()?;
        let node_port = request.create_node_port()?;

        // Indexed instances are addressed one by one through their own service.
        let services: Vec<ServiceSpec> = if request.indexed()? {
            targets(id, true, request.count()?)
                .into_iter()
                .map(|target| ServiceSpec {
                    name: target.workload.to_string(),
                    labels: Labels::for_workload(id, target.workload.as_str()).merge(&labels),
                    selector: [(DEPLOYMENT_ID_LABEL.to_string(), target.workload.to_string())]
                        .into(),
                    port,
                    node_port,
                })
                .collect()
        } else {
            vec![ServiceSpec {
                name: id.to_string(),
                labels,
                selector: [(APP_ID_LABEL.to_string(), id.to_string())].into(),
                port,
                node_port,
            }]
        };
        let create_route = request.create_route()?;
        for service in services {
            self.platform
                .apply_service(&service)
                .await
                .map_err(DeployError::platform("service"))?;
            if create_route {
                let route = RouteSpec {
                    name: service.name.clone(),
                    service: service.name,
                    labels: service.labels,
                    port,
                };
                self.platform
                    .apply_route(&route)
                    .await
                    .map_err(DeployError::platform("route"))?;
            }
        }
        Ok(())
    }
}
