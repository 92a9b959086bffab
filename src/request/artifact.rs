// ABOUTME: Artifact references carried by a deployment request.
// ABOUTME: Parses maven://, docker: and file: forms into a typed reference.

use crate::types::ImageRef;
use std::fmt;
use std::path::PathBuf;

use super::RequestError;

/// Maven coordinates in `group:artifact[:extension[:classifier]]:version` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: Option<String>,
    pub version: String,
}

impl MavenCoordinates {
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let parts: Vec<&str> = input.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(RequestError::InvalidArtifact(input.to_string()));
        }
        let (group, artifact, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, "jar", None, *v),
            [g, a, e, v] => (*g, *a, *e, None, *v),
            [g, a, e, c, v] => (*g, *a, *e, Some(*c), *v),
            _ => return Err(RequestError::InvalidArtifact(input.to_string())),
        };
        Ok(Self {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            extension: extension.to_string(),
            classifier: classifier.map(str::to_string),
            version: version.to_string(),
        })
    }

    /// File name inside a repository, e.g. `app-1.0-exec.jar`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Path relative to a repository root: `group/as/dirs/artifact/version/file`.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.file_name()
        )
    }

    /// Sibling project descriptor path, `artifact-version.pom`.
    pub fn pom_path(&self) -> String {
        format!(
            "{}/{}/{}/{}-{}.pom",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.artifact_id,
            self.version
        )
    }

    /// Download URL of the artifact in a remote repository.
    pub fn remote_url(&self, repository_url: &str) -> String {
        format!(
            "{}/{}",
            repository_url.trim_end_matches('/'),
            self.repository_path()
        )
    }
}

impl fmt::Display for MavenCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// What a request deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    Maven(MavenCoordinates),
    File(PathBuf),
    Docker(ImageRef),
}

impl ArtifactRef {
    /// Parse `maven://coords`, `docker:image`, `file:path`, or a bare path.
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RequestError::InvalidArtifact(input.to_string()));
        }
        if let Some(coords) = input.strip_prefix("maven://") {
            return MavenCoordinates::parse(coords).map(ArtifactRef::Maven);
        }
        if let Some(image) = input.strip_prefix("docker:") {
            let image = image.trim_start_matches("//");
            return ImageRef::parse(image)
                .map(ArtifactRef::Docker)
                .map_err(|e| RequestError::InvalidArtifact(format!("{input}: {e}")));
        }
        let path = input.strip_prefix("file:").unwrap_or(input);
        let path = path.strip_prefix("//").unwrap_or(path);
        Ok(ArtifactRef::File(PathBuf::from(path)))
    }

    /// Whether this artifact has to be built into an image before it can run.
    pub fn needs_build(&self) -> bool {
        !matches!(self, ArtifactRef::Docker(_))
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRef::Maven(coords) => write!(f, "maven://{coords}"),
            ArtifactRef::File(path) => write!(f, "file:{}", path.display()),
            ArtifactRef::Docker(image) => write!(f, "docker:{image}"),
        }
    }
}
