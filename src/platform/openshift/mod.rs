// ABOUTME: OpenShift control plane client on a kube API client.
// ABOUTME: Implements every capability trait; create-or-replace is server-side apply.

mod manifests;
mod wire;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use snafu::{OptionExt, ResultExt};
use std::fmt::Debug;

use super::error::{
    BuildRequestSnafu, ClientSnafu, EndpointSnafu, InferSnafu, PlatformError, TransportError,
};
use super::model::{
    BuildConfigSpec, BuildRecord, BuildRequestSpec, INSTANCE_INDEX_ENV, ImageStreamSpec, PodSpec,
    PodSummary, RolloutRequest, RouteSpec, ServiceSpec, WorkloadSpec, WorkloadSummary,
};
use super::traits::{
    BuildEventStream, BuildOps, ExposureOps, ImageStreamOps, PodOps, WorkloadOps,
};
use crate::config::ApiConfig;
use crate::types::{PodName, Selector, WorkloadName};

/// Field manager recorded on every server-side apply.
const FIELD_MANAGER: &str = "kiln";

/// API kinds kiln works with.
#[derive(Debug, Clone, Copy)]
enum Kind {
    BuildConfig,
    Build,
    ImageStream,
    DeploymentConfig,
    Service,
    Route,
    Pod,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::BuildConfig => "BuildConfig",
            Kind::Build => "Build",
            Kind::ImageStream => "ImageStream",
            Kind::DeploymentConfig => "DeploymentConfig",
            Kind::Service => "Service",
            Kind::Route => "Route",
            Kind::Pod => "Pod",
        }
    }

    /// Resource description for the OpenShift kinds, which have no typed bindings.
    fn resource(self) -> ApiResource {
        let (group, plural) = match self {
            Kind::BuildConfig => ("build.openshift.io", "buildconfigs"),
            Kind::Build => ("build.openshift.io", "builds"),
            Kind::ImageStream => ("image.openshift.io", "imagestreams"),
            Kind::DeploymentConfig => ("apps.openshift.io", "deploymentconfigs"),
            Kind::Route => ("route.openshift.io", "routes"),
            Kind::Service => ("", "services"),
            Kind::Pod => ("", "pods"),
        };
        let gvk = GroupVersionKind::gvk(group, "v1", self.name());
        ApiResource::from_gvk_with_plural(&gvk, plural)
    }
}

/// Map a kube client error onto a platform error for `kind`/`name`.
fn failure(kind: Kind, name: &str, error: kube::Error) -> PlatformError {
    match error {
        kube::Error::Api(resp) if resp.code == 404 => PlatformError::NotFound {
            kind: kind.name(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) if resp.code == 409 => PlatformError::Conflict {
            kind: kind.name(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) => PlatformError::Api {
            status: resp.code,
            message: resp.message,
        },
        kube::Error::SerdeError(e) => PlatformError::from(e),
        source => PlatformError::Transport(TransportError::Request {
            kind: kind.name(),
            name: name.to_string(),
            source,
        }),
    }
}

fn is_status(error: &kube::Error, code: u16) -> bool {
    matches!(error, kube::Error::Api(resp) if resp.code == code)
}

/// Path of the binary build upload for `config`.
fn binary_upload_path(namespace: &str, config: &str, file_name: &str) -> String {
    format!(
        "{}/{}/instantiatebinary?asFile={}",
        DynamicObject::url_path(&Kind::BuildConfig.resource(), Some(namespace)),
        urlencoding::encode(config),
        urlencoding::encode(file_name)
    )
}

/// Turn one watcher event into a build observation.
///
/// Objects that do not decode as builds are logged and skipped; watcher
/// failures end up as transport errors.
fn build_event(
    event: Result<watcher::Event<DynamicObject>, watcher::Error>,
) -> Option<Result<BuildRecord, PlatformError>> {
    match event {
        Ok(watcher::Event::Apply(object) | watcher::Event::InitApply(object)) => {
            let name = object.name_any();
            match wire::decode::<wire::Build>(object) {
                Ok(build) => Some(Ok(build.into())),
                Err(e) => {
                    tracing::warn!(build = %name, error = %e, "skipping undecodable build");
                    None
                }
            }
        }
        Ok(_) => None,
        Err(source) => Some(Err(TransportError::Watch { source }.into())),
    }
}

async fn apply<K>(api: &Api<K>, kind: Kind, name: &str, manifest: &Value) -> Result<(), PlatformError>
where
    K: Clone + DeserializeOwned + Debug,
{
    let params = PatchParams::apply(FIELD_MANAGER).force();
    api.patch(name, &params, &Patch::Apply(manifest))
        .await
        .map_err(|e| failure(kind, name, e))?;
    tracing::debug!(kind = kind.name(), name, "applied");
    Ok(())
}

async fn list<K>(api: &Api<K>, kind: Kind, selector: &Selector) -> Result<Vec<K>, PlatformError>
where
    K: Clone + DeserializeOwned + Debug,
{
    let labels = selector.to_string();
    let objects = api
        .list(&ListParams::default().labels(&labels))
        .await
        .map_err(|e| failure(kind, &labels, e))?;
    Ok(objects.items)
}

/// Delete one object. A missing object counts as deleted.
async fn delete<K>(api: &Api<K>, kind: Kind, name: &str, params: &DeleteParams) -> Result<(), PlatformError>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, params).await {
        Ok(_) => Ok(()),
        Err(e) if is_status(&e, 404) => Ok(()),
        Err(e) => Err(failure(kind, name, e)),
    }
}

async fn delete_selected<K>(api: &Api<K>, kind: Kind, selector: &Selector) -> Result<usize, PlatformError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let objects = list(api, kind, selector).await?;
    for object in &objects {
        delete(api, kind, &object.name_any(), &DeleteParams::background()).await?;
    }
    Ok(objects.len())
}

pub struct OpenShiftClient {
    client: Client,
    namespace: String,
}

impl OpenShiftClient {
    /// Connect to the configured endpoint, or to the ambient kubeconfig or
    /// in-cluster environment when no endpoint is set.
    pub async fn connect(config: &ApiConfig) -> Result<Self, PlatformError> {
        let mut kube_config = match &config.url {
            Some(url) => {
                let uri = url.parse::<http::Uri>().ok().context(EndpointSnafu { url })?;
                kube::Config::new(uri)
            }
            None => kube::Config::infer().await.context(InferSnafu)?,
        };
        kube_config.default_namespace = config.namespace.clone();
        kube_config.connect_timeout = Some(config.timeout);
        let client = Client::try_from(kube_config).context(ClientSnafu)?;
        Ok(Self::with_client(client, config.namespace.clone()))
    }

    pub fn with_client(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn dynamic(&self, kind: Kind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &kind.resource())
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl BuildOps for OpenShiftClient {
    async fn apply_build_config(&self, spec: &BuildConfigSpec) -> Result<(), PlatformError> {
        let manifest = manifests::build_config(spec);
        apply(&self.dynamic(Kind::BuildConfig), Kind::BuildConfig, &spec.name, &manifest).await
    }

    async fn instantiate_build(
        &self,
        config: &str,
        request: &BuildRequestSpec,
    ) -> Result<BuildRecord, PlatformError> {
        let body = serde_json::to_vec(&manifests::build_request(config, request))?;
        let build: DynamicObject = self
            .dynamic(Kind::BuildConfig)
            .create_subresource("instantiate", config, &PostParams::default(), body)
            .await
            .map_err(|e| failure(Kind::BuildConfig, config, e))?;
        Ok(wire::decode::<wire::Build>(build)?.into())
    }

    async fn instantiate_binary(
        &self,
        config: &str,
        file_name: &str,
        payload: Bytes,
    ) -> Result<BuildRecord, PlatformError> {
        let path = binary_upload_path(&self.namespace, config, file_name);
        tracing::debug!(config, file_name, bytes = payload.len(), "uploading binary build input");
        let request = http::Request::post(&path)
            .header(http::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec())
            .context(BuildRequestSnafu { path: path.clone() })?;
        let build: DynamicObject = self
            .client
            .request(request)
            .await
            .map_err(|e| failure(Kind::BuildConfig, config, e))?;
        Ok(wire::decode::<wire::Build>(build)?.into())
    }

    async fn list_builds(&self, selector: &Selector) -> Result<Vec<BuildRecord>, PlatformError> {
        let objects = list(&self.dynamic(Kind::Build), Kind::Build, selector).await?;
        objects
            .into_iter()
            .map(|object| wire::decode::<wire::Build>(object).map(BuildRecord::from))
            .collect()
    }

    async fn watch_builds(&self, selector: &Selector) -> Result<BuildEventStream, PlatformError> {
        let config = watcher::Config::default().labels(&selector.to_string());
        let events = watcher(self.dynamic(Kind::Build), config)
            .filter_map(|event| async move { build_event(event) });
        Ok(Box::pin(events))
    }
}

#[async_trait]
impl ImageStreamOps for OpenShiftClient {
    async fn ensure_image_stream(&self, spec: &ImageStreamSpec) -> Result<(), PlatformError> {
        let stream: DynamicObject = serde_json::from_value(manifests::image_stream(spec))?;
        match self
            .dynamic(Kind::ImageStream)
            .create(&PostParams::default(), &stream)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 409) => Ok(()),
            Err(e) => Err(failure(Kind::ImageStream, &spec.name, e)),
        }
    }
}

#[async_trait]
impl WorkloadOps for OpenShiftClient {
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<(), PlatformError> {
        let manifest = manifests::deployment_config(spec);
        let api = self.dynamic(Kind::DeploymentConfig);
        apply(&api, Kind::DeploymentConfig, spec.name.as_str(), &manifest).await
    }

    async fn rollout(&self, request: &RolloutRequest) -> Result<(), PlatformError> {
        let name = request.name.as_str();
        let api = self.dynamic(Kind::DeploymentConfig);
        let current = api
            .get(name)
            .await
            .map_err(|e| failure(Kind::DeploymentConfig, name, e))?;
        let mut dc = serde_json::to_value(&current)?;
        let env = request
            .instance_index
            .map(|index| (INSTANCE_INDEX_ENV, index.to_string()));
        if !manifests::retarget_workload(&mut dc, &request.image.to_string(), env) {
            return Err(PlatformError::Decode(format!(
                "DeploymentConfig {name} has no container to update"
            )));
        }
        let updated: DynamicObject = serde_json::from_value(dc)?;
        api.replace(name, &PostParams::default(), &updated)
            .await
            .map_err(|e| failure(Kind::DeploymentConfig, name, e))?;

        let body = serde_json::to_vec(&manifests::deployment_request(name))?;
        let _: DynamicObject = api
            .create_subresource("instantiate", name, &PostParams::default(), body)
            .await
            .map_err(|e| failure(Kind::DeploymentConfig, name, e))?;
        tracing::info!(workload = name, image = %request.image, "rollout started");
        Ok(())
    }

    async fn scale_workload(
        &self,
        name: &WorkloadName,
        replicas: u32,
    ) -> Result<(), PlatformError> {
        let patch = json!({"spec": {"replicas": replicas}});
        self.dynamic(Kind::DeploymentConfig)
            .patch(name.as_str(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| failure(Kind::DeploymentConfig, name.as_str(), e))?;
        Ok(())
    }

    async fn list_workloads(
        &self,
        selector: &Selector,
    ) -> Result<Vec<WorkloadSummary>, PlatformError> {
        let api = self.dynamic(Kind::DeploymentConfig);
        list(&api, Kind::DeploymentConfig, selector)
            .await?
            .into_iter()
            .map(|object| {
                wire::decode::<wire::DeploymentConfig>(object).map(WorkloadSummary::from)
            })
            .collect()
    }

    async fn delete_workload(&self, name: &WorkloadName) -> Result<(), PlatformError> {
        let api = self.dynamic(Kind::DeploymentConfig);
        delete(&api, Kind::DeploymentConfig, name.as_str(), &DeleteParams::background()).await
    }
}

#[async_trait]
impl ExposureOps for OpenShiftClient {
    async fn apply_service(&self, spec: &ServiceSpec) -> Result<(), PlatformError> {
        apply(&self.services(), Kind::Service, &spec.name, &manifests::service(spec)).await
    }

    async fn apply_route(&self, spec: &RouteSpec) -> Result<(), PlatformError> {
        apply(&self.dynamic(Kind::Route), Kind::Route, &spec.name, &manifests::route(spec)).await
    }

    async fn delete_services(&self, selector: &Selector) -> Result<usize, PlatformError> {
        delete_selected(&self.services(), Kind::Service, selector).await
    }

    async fn delete_routes(&self, selector: &Selector) -> Result<usize, PlatformError> {
        delete_selected(&self.dynamic(Kind::Route), Kind::Route, selector).await
    }
}

#[async_trait]
impl PodOps for OpenShiftClient {
    async fn create_pod(&self, spec: &PodSpec) -> Result<(), PlatformError> {
        let pod: Pod = serde_json::from_value(manifests::pod(spec))?;
        self.pods()
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| failure(Kind::Pod, spec.name.as_str(), e))?;
        Ok(())
    }

    async fn get_pod(&self, name: &PodName) -> Result<Option<PodSummary>, PlatformError> {
        let pod = self
            .pods()
            .get_opt(name.as_str())
            .await
            .map_err(|e| failure(Kind::Pod, name.as_str(), e))?;
        Ok(pod.map(PodSummary::from))
    }

    async fn list_pods(&self, selector: &Selector) -> Result<Vec<PodSummary>, PlatformError> {
        let pods = list(&self.pods(), Kind::Pod, selector).await?;
        Ok(pods.into_iter().map(PodSummary::from).collect())
    }

    async fn delete_pod(&self, name: &PodName) -> Result<(), PlatformError> {
        let params = DeleteParams::background().grace_period(0);
        delete(&self.pods(), Kind::Pod, name.as_str(), &params).await
    }
}
