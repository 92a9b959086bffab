// ABOUTME: Build strategy selection for artifacts that must be built into an image.
// ABOUTME: Four candidates are tried in fixed priority order; the binary source build always applies.

use crate::artifact::ArtifactResolver;
use crate::config::Config;
use crate::request::{DeploymentRequest, keys};
use crate::types::ImageRef;

use super::error::BuildError;
use super::git::{normalize_scm_uri, scm_ref};

/// A git repository to build from with a Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub uri: String,
    pub git_ref: String,
    pub dockerfile_path: String,
    pub secret: Option<String>,
}

/// How the image for a request gets built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStrategy {
    /// Git repository named explicitly by application properties.
    GitRepoWithDockerfileProperty(GitSource),

    /// Git repository found in the artifact's project descriptor, with a
    /// Dockerfile packaged inside the artifact.
    GitRepoDiscoveredInArtifact(GitSource),

    /// Dockerfile text supplied by a deployment property, directly or as a file path.
    InlineOrFileDockerfile { dockerfile: String },

    /// Artifact bytes uploaded as input to a source-to-image builder.
    BinaryInputSourceImage { builder: ImageRef },
}

impl BuildStrategy {
    /// Select the strategy for `request`.
    ///
    /// Returns the strategy and the reason it was chosen. Later candidates are
    /// never inspected once one matches. Artifact inspection failures fall
    /// through to the next candidate.
    pub async fn select(
        request: &DeploymentRequest,
        resolver: &dyn ArtifactResolver,
        config: &Config,
    ) -> Result<(Self, &'static str), BuildError> {
        if let Some(source) = explicit_git_source(request) {
            return Ok((
                BuildStrategy::GitRepoWithDockerfileProperty(source),
                "git repository set in application properties",
            ));
        }

        if let Some(source) = discovered_git_source(request, resolver, config).await {
            return Ok((
                BuildStrategy::GitRepoDiscoveredInArtifact(source),
                "artifact declares its source repository and packages a Dockerfile",
            ));
        }

        if let Some(value) = request.deployment_property(keys::BUILD_DOCKERFILE) {
            let dockerfile = read_dockerfile(value).await?;
            return Ok((
                BuildStrategy::InlineOrFileDockerfile { dockerfile },
                "Dockerfile supplied in deployment properties",
            ));
        }

        let builder = request
            .s2i_image()?
            .unwrap_or_else(|| config.build.s2i_image.clone());
        Ok((
            BuildStrategy::BinaryInputSourceImage {
                builder: config.images.resolve(&builder),
            },
            "no build source configured, uploading artifact to builder image",
        ))
    }

    /// Whether the build input is uploaded when the build is started.
    pub fn is_binary(&self) -> bool {
        matches!(self, BuildStrategy::BinaryInputSourceImage { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            BuildStrategy::GitRepoWithDockerfileProperty(_) => "git (application properties)",
            BuildStrategy::GitRepoDiscoveredInArtifact(_) => "git (project descriptor)",
            BuildStrategy::InlineOrFileDockerfile { .. } => "dockerfile",
            BuildStrategy::BinaryInputSourceImage { .. } => "binary source",
        }
    }
}

fn explicit_git_source(request: &DeploymentRequest) -> Option<GitSource> {
    let uri = request
        .app_property(keys::GIT_URI)
        .filter(|uri| !uri.trim().is_empty())?;
    Some(GitSource {
        uri: uri.trim().to_string(),
        git_ref: request
            .app_property(keys::GIT_REF)
            .unwrap_or(keys::DEFAULT_GIT_REF)
            .to_string(),
        dockerfile_path: request
            .app_property(keys::GIT_DOCKERFILE)
            .unwrap_or(keys::DEFAULT_DOCKERFILE)
            .to_string(),
        secret: request.app_property(keys::GIT_SECRET).map(str::to_string),
    })
}

async fn discovered_git_source(
    request: &DeploymentRequest,
    resolver: &dyn ArtifactResolver,
    config: &Config,
) -> Option<GitSource> {
    let artifact = request.artifact();
    let scm = match resolver.project_scm(artifact).await {
        Ok(Some(scm)) => scm,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(%artifact, error = %e, "could not read project descriptor");
            return None;
        }
    };

    let dockerfile_path = request
        .app_property(keys::GIT_DOCKERFILE)
        .unwrap_or(&config.build.artifact_dockerfile);
    match resolver.contains_entry(artifact, dockerfile_path).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(%artifact, dockerfile_path, "artifact has no Dockerfile");
            return None;
        }
        Err(e) => {
            tracing::warn!(%artifact, error = %e, "could not list artifact contents");
            return None;
        }
    }

    Some(GitSource {
        uri: normalize_scm_uri(&scm.connection),
        git_ref: scm_ref(scm.tag.as_deref(), keys::DEFAULT_GIT_REF).to_string(),
        dockerfile_path: dockerfile_path.to_string(),
        secret: request.app_property(keys::GIT_SECRET).map(str::to_string),
    })
}

/// The value itself, or the contents of the file it names.
async fn read_dockerfile(value: &str) -> Result<String, BuildError> {
    match tokio::fs::metadata(value).await {
        Ok(meta) if meta.is_file() => {
            tokio::fs::read_to_string(value)
                .await
                .map_err(|source| BuildError::Dockerfile {
                    path: value.to_string(),
                    source,
                })
        }
        _ => Ok(value.to_string()),
    }
}
