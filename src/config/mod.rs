// ABOUTME: Configuration types and parsing for kiln.yml.
// ABOUTME: Covers the API endpoint, build and workload defaults, image mirroring, maven and teardown.

mod deserialize;
mod env_value;
mod init;
mod repository;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use repository::{MavenConfig, RemoteRepository, RepositoryAuth};

use crate::error::{Error, Result};
use crate::platform::model::{ResourceSpec, VolumeMountSpec, VolumeSpec};
use crate::types::ImageRef;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "kiln.yml";
pub const CONFIG_FILENAME_ALT: &str = "kiln.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".kiln/config.yml";

pub const DEFAULT_S2I_IMAGE: &str = "fabric8/s2i-java:latest-java11";
pub const DEFAULT_IMAGE_TAG: &str = "latest";
pub const DEFAULT_ARTIFACT_DOCKERFILE: &str = "src/main/docker/Dockerfile";
pub const DEFAULT_CONTAINER_COMMAND: &str = "/usr/local/s2i/run";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub build: BuildSettings,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub maven: Option<MavenConfig>,

    #[serde(default)]
    pub teardown: TeardownConfig,

    #[serde(default)]
    pub workload: WorkloadDefaults,
}

/// Where the cluster API is reachable and which namespace objects live in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Explicit endpoint, e.g. a `kubectl proxy`. Unset means kubeconfig or in-cluster.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            namespace: default_namespace(),
            timeout: default_request_timeout(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    /// Rebuild every deployment regardless of existing builds.
    #[serde(default)]
    pub force: bool,

    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    #[serde(
        default = "default_s2i_image",
        deserialize_with = "deserialize::deserialize_image_ref"
    )]
    pub s2i_image: ImageRef,

    /// Entrypoint for workloads running binary-built images.
    #[serde(default = "default_container_command")]
    pub container_command: String,

    #[serde(default = "default_artifact_dockerfile")]
    pub artifact_dockerfile: String,

    /// Extra environment passed to every build.
    #[serde(default)]
    pub environment: HashMap<String, EnvValue>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            force: false,
            image_tag: default_image_tag(),
            s2i_image: default_s2i_image(),
            container_command: default_container_command(),
            artifact_dockerfile: default_artifact_dockerfile(),
            environment: HashMap::new(),
        }
    }
}

fn default_image_tag() -> String {
    DEFAULT_IMAGE_TAG.to_string()
}

fn default_s2i_image() -> ImageRef {
    ImageRef::from_parts(None, "fabric8/s2i-java", "latest-java11")
}

fn default_container_command() -> String {
    DEFAULT_CONTAINER_COMMAND.to_string()
}

fn default_artifact_dockerfile() -> String {
    DEFAULT_ARTIFACT_DOCKERFILE.to_string()
}

/// Container shaping applied to every workload and task pod. Request
/// properties override volumes and mounts by name, resources by field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkloadDefaults {
    #[serde(default)]
    pub resources: ResourceSpec,

    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,

    #[serde(default)]
    pub volume_mounts: Vec<VolumeMountSpec>,
}

/// Registry mirroring for builder and deployed images.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub registry_override: Option<String>,

    #[serde(default)]
    pub project: Option<String>,
}

impl ImagesConfig {
    /// Apply the registry override, if any.
    pub fn resolve(&self, image: &ImageRef) -> ImageRef {
        match &self.registry_override {
            Some(registry) => image.rehome(registry, self.project.as_deref()),
            None => image.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeardownConfig {
    #[serde(default = "default_scale_down_timeout", with = "humantime_serde")]
    pub scale_down_timeout: Duration,

    /// Pause after undeploy so the platform can settle before a redeploy.
    #[serde(default = "default_undeploy_delay", with = "humantime_serde")]
    pub undeploy_delay: Duration,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            scale_down_timeout: default_scale_down_timeout(),
            undeploy_delay: default_undeploy_delay(),
        }
    }
}

fn default_scale_down_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_undeploy_delay() -> Duration {
    Duration::from_secs(1)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Path of the first config file present in `dir`, if any.
    pub fn locate(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::locate(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api.url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::InvalidConfig(format!(
                "api.url must be an http:// or https:// endpoint: {url}"
            )));
        }
        if self.api.namespace.is_empty() {
            return Err(Error::InvalidConfig("api.namespace cannot be empty".into()));
        }
        if self.build.image_tag.is_empty() {
            return Err(Error::InvalidConfig("build.image_tag cannot be empty".into()));
        }
        if let Some(value) = self.workload.resources.invalid_quantity() {
            return Err(Error::InvalidConfig(format!(
                "workload.resources: invalid quantity {value:?}"
            )));
        }
        if self.images.project.is_some() && self.images.registry_override.is_none() {
            return Err(Error::InvalidConfig(
                "images.project requires images.registry_override".into(),
            ));
        }
        Ok(())
    }
}
