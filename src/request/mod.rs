// ABOUTME: Immutable deployment request and typed access to its properties.
// ABOUTME: Builders return new values so a request can be re-targeted without mutation.

mod artifact;
pub mod keys;

pub use artifact::{ArtifactRef, MavenCoordinates};

use crate::platform::model::{
    ComputeResources, ResourceSpec, VolumeMountSpec, VolumeSpec, is_quantity,
};
use crate::types::{AppId, AppIdError, AppName, ImageRef, LabelParseError, Labels};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid artifact reference: {0}")]
    InvalidArtifact(String),

    #[error("invalid value for {key}: {value}")]
    InvalidProperty { key: &'static str, value: String },

    #[error("invalid property assignment '{0}': expected key=value")]
    InvalidAssignment(String),

    #[error(transparent)]
    Name(#[from] AppIdError),

    #[error(transparent)]
    Labels(#[from] LabelParseError),
}

/// Name and free-form properties of the application being deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDefinition {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl AppDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    definition: AppDefinition,
    artifact: ArtifactRef,
    deployment_properties: BTreeMap<String, String>,
    args: Vec<String>,
}

impl DeploymentRequest {
    pub fn new(definition: AppDefinition, artifact: ArtifactRef) -> Self {
        Self {
            definition,
            artifact,
            deployment_properties: BTreeMap::new(),
            args: Vec::new(),
        }
    }

    /// Copy of this request with one deployment property set.
    pub fn with_deployment_property(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.deployment_properties
            .insert(key.to_string(), value.to_string());
        next
    }

    pub fn with_deployment_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.deployment_properties.extend(properties);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Copy of this request pointing at an already built image.
    pub fn with_artifact(&self, artifact: ArtifactRef) -> Self {
        let mut next = self.clone();
        next.artifact = artifact;
        next
    }

    pub fn definition(&self) -> &AppDefinition {
        &self.definition
    }

    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn deployment_properties(&self) -> &BTreeMap<String, String> {
        &self.deployment_properties
    }

    pub fn app_property(&self, key: &str) -> Option<&str> {
        self.definition.property(key)
    }

    pub fn deployment_property(&self, key: &str) -> Option<&str> {
        self.deployment_properties
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, RequestError> {
        match self.deployment_property(key) {
            None => Ok(None),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(RequestError::InvalidProperty {
                    key,
                    value: value.to_string(),
                }),
            },
        }
    }

    fn number<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, RequestError> {
        self.deployment_property(key)
            .map(|value| {
                value.trim().parse().map_err(|_| RequestError::InvalidProperty {
                    key,
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    fn yaml_list<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>, RequestError> {
        match self.deployment_property(key) {
            None => Ok(Vec::new()),
            Some(value) => serde_yaml::from_str(value).map_err(|e| {
                tracing::debug!(key, error = %e, "unparseable list property");
                RequestError::InvalidProperty {
                    key,
                    value: value.to_string(),
                }
            }),
        }
    }

    fn quantity(&self, key: &'static str) -> Result<Option<String>, RequestError> {
        match self.deployment_property(key).map(str::trim) {
            None => Ok(None),
            Some(value) if is_quantity(value) => Ok(Some(value.to_string())),
            Some(value) => Err(RequestError::InvalidProperty {
                key,
                value: value.to_string(),
            }),
        }
    }

    pub fn app_name(&self) -> Result<AppName, RequestError> {
        Ok(AppName::new(&self.definition.name)?)
    }

    pub fn group(&self) -> Option<&str> {
        self.deployment_property(keys::GROUP)
    }

    /// Explicit id wins; otherwise `[group-]name`.
    pub fn app_id(&self) -> Result<AppId, RequestError> {
        if let Some(id) = self.deployment_property(keys::APP_ID) {
            return Ok(AppId::new(id)?);
        }
        Ok(AppId::derive(self.group(), &self.app_name()?)?)
    }

    /// `kiln.build.force`: `Some(true)` rebuilds, `Some(false)` forbids a rebuild.
    pub fn force_build(&self) -> Result<Option<bool>, RequestError> {
        self.flag(keys::BUILD_FORCE)
    }

    pub fn indexed(&self) -> Result<bool, RequestError> {
        Ok(self.flag(keys::INDEXED)?.unwrap_or(false))
    }

    /// Number of instances; at least one.
    pub fn count(&self) -> Result<u32, RequestError> {
        match self.number::<u32>(keys::COUNT)? {
            Some(0) => Err(RequestError::InvalidProperty {
                key: keys::COUNT,
                value: "0".to_string(),
            }),
            Some(n) => Ok(n),
            None => Ok(1),
        }
    }

    pub fn port(&self) -> Result<u16, RequestError> {
        Ok(self.number(keys::PORT)?.unwrap_or(keys::DEFAULT_PORT))
    }

    pub fn create_route(&self) -> Result<bool, RequestError> {
        Ok(self.flag(keys::CREATE_ROUTE)?.unwrap_or(false))
    }

    pub fn create_node_port(&self) -> Result<bool, RequestError> {
        Ok(self.flag(keys::CREATE_NODE_PORT)?.unwrap_or(false))
    }

    pub fn labels(&self) -> Result<Labels, RequestError> {
        Ok(self
            .deployment_property(keys::LABELS)
            .map(Labels::parse_list)
            .transpose()?
            .unwrap_or_default())
    }

    pub fn image_tag<'a>(&'a self, default: &'a str) -> &'a str {
        self.deployment_property(keys::IMAGE_TAG).unwrap_or(default)
    }

    pub fn s2i_image(&self) -> Result<Option<ImageRef>, RequestError> {
        self.deployment_property(keys::BUILD_S2I_IMAGE)
            .map(|v| {
                ImageRef::parse(v).map_err(|_| RequestError::InvalidProperty {
                    key: keys::BUILD_S2I_IMAGE,
                    value: v.to_string(),
                })
            })
            .transpose()
    }

    pub fn volumes(&self) -> Result<Vec<VolumeSpec>, RequestError> {
        self.yaml_list(keys::VOLUMES)
    }

    pub fn volume_mounts(&self) -> Result<Vec<VolumeMountSpec>, RequestError> {
        self.yaml_list(keys::VOLUME_MOUNTS)
    }

    /// Resource limits and requests set on this request alone.
    pub fn resources(&self) -> Result<ResourceSpec, RequestError> {
        Ok(ResourceSpec {
            limits: ComputeResources {
                cpu: self.quantity(keys::LIMITS_CPU)?,
                memory: self.quantity(keys::LIMITS_MEMORY)?,
            },
            requests: ComputeResources {
                cpu: self.quantity(keys::REQUESTS_CPU)?,
                memory: self.quantity(keys::REQUESTS_MEMORY)?,
            },
        })
    }

    /// Whether this request's image is produced by a binary source build.
    pub fn is_s2i_build(&self) -> bool {
        self.flag(keys::S2I_BUILD_MARKER).ok().flatten().unwrap_or(false)
    }
}

/// Parse a `key=value` command-line assignment.
pub fn parse_assignment(input: &str) -> Result<(String, String), RequestError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(RequestError::InvalidAssignment(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DeploymentRequest {
        DeploymentRequest::new(
            AppDefinition::new("ticker").with_property("server.port", "9000"),
            ArtifactRef::parse("maven://org.example:ticker:1.0").unwrap(),
        )
        .with_args(vec!["--verbose".to_string()])
    }

    #[test]
    fn with_deployment_property_preserves_everything_else() {
        let original = request();
        let marked = original.with_deployment_property(keys::S2I_BUILD_MARKER, "true");
        assert!(marked.is_s2i_build());
        assert!(!original.is_s2i_build());
        assert_eq!(marked.definition(), original.definition());
        assert_eq!(marked.artifact(), original.artifact());
        assert_eq!(marked.args(), original.args());
    }

    #[test]
    fn app_id_prefers_explicit_then_group() {
        let req = request();
        assert_eq!(req.app_id().unwrap().as_str(), "ticker");
        let grouped = req.with_deployment_property(keys::GROUP, "stream1");
        assert_eq!(grouped.app_id().unwrap().as_str(), "stream1-ticker");
        let explicit = grouped.with_deployment_property(keys::APP_ID, "custom");
        assert_eq!(explicit.app_id().unwrap().as_str(), "custom");
    }

    #[test]
    fn long_name_is_rejected() {
        let req = DeploymentRequest::new(
            AppDefinition::new("a-very-long-application-name"),
            ArtifactRef::parse("app.jar").unwrap(),
        );
        assert!(matches!(
            req.app_id(),
            Err(RequestError::Name(AppIdError::NameTooLong(_)))
        ));
    }

    #[test]
    fn count_and_indexed_defaults() {
        let req = request();
        assert_eq!(req.count().unwrap(), 1);
        assert!(!req.indexed().unwrap());
        let fanned = req
            .with_deployment_property(keys::COUNT, "3")
            .with_deployment_property(keys::INDEXED, "TRUE");
        assert_eq!(fanned.count().unwrap(), 3);
        assert!(fanned.indexed().unwrap());
    }

    #[test]
    fn invalid_values_are_reported() {
        let req = request().with_deployment_property(keys::COUNT, "0");
        assert!(req.count().is_err());
        let req = request().with_deployment_property(keys::CREATE_ROUTE, "yes");
        assert!(matches!(
            req.create_route(),
            Err(RequestError::InvalidProperty { key: keys::CREATE_ROUTE, .. })
        ));
    }

    #[test]
    fn blank_property_counts_as_unset() {
        let req = request().with_deployment_property(keys::BUILD_FORCE, " ");
        assert_eq!(req.force_build().unwrap(), None);
    }

    #[test]
    fn volumes_and_mounts_parse_from_yaml_lists() {
        let req = request()
            .with_deployment_property(
                keys::VOLUMES,
                "[{name: data, persistentVolumeClaim: {claimName: ticker}}, {name: tmp, emptyDir: {}}]",
            )
            .with_deployment_property(keys::VOLUME_MOUNTS, "[{name: data, mountPath: /var/data}]");
        let volumes = req.volumes().unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "data");
        assert!(volumes[1].source.contains_key("emptyDir"));
        let mounts = req.volume_mounts().unwrap();
        assert_eq!(mounts[0].mount_path, "/var/data");
        assert!(!mounts[0].read_only);

        assert!(request().volumes().unwrap().is_empty());
        let broken = request().with_deployment_property(keys::VOLUME_MOUNTS, "[{name: data}]");
        assert!(matches!(
            broken.volume_mounts(),
            Err(RequestError::InvalidProperty { key: keys::VOLUME_MOUNTS, .. })
        ));
    }

    #[test]
    fn resources_are_validated_quantities() {
        let req = request()
            .with_deployment_property(keys::LIMITS_MEMORY, "1Gi")
            .with_deployment_property(keys::REQUESTS_CPU, " 250m ");
        let resources = req.resources().unwrap();
        assert_eq!(resources.limits.memory.as_deref(), Some("1Gi"));
        assert_eq!(resources.limits.cpu, None);
        assert_eq!(resources.requests.cpu.as_deref(), Some("250m"));

        let bad = request().with_deployment_property(keys::LIMITS_CPU, "half");
        assert!(matches!(
            bad.resources(),
            Err(RequestError::InvalidProperty { key: keys::LIMITS_CPU, .. })
        ));
    }

    #[test]
    fn parses_assignments() {
        assert_eq!(
            parse_assignment("kiln.count=2").unwrap(),
            ("kiln.count".to_string(), "2".to_string())
        );
        assert_eq!(
            parse_assignment("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
    }
}
