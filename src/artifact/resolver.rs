// ABOUTME: Locates artifact content on the local filesystem.
// ABOUTME: Maven coordinates resolve against a local repository layout; files resolve as paths.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::archive::list_entries;
use super::error::ArtifactError;
use super::pom::{ScmInfo, scm_info};
use crate::config::MavenConfig;
use crate::request::ArtifactRef;

/// Access to artifact content and metadata.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Raw bytes of the artifact. `NotFound` when it is not available locally.
    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, ArtifactError>;

    /// Source control coordinates declared in the artifact's project descriptor.
    async fn project_scm(&self, artifact: &ArtifactRef) -> Result<Option<ScmInfo>, ArtifactError>;

    /// Whether the artifact archive contains `entry`.
    async fn contains_entry(&self, artifact: &ArtifactRef, entry: &str)
    -> Result<bool, ArtifactError>;
}

pub struct LocalArtifactResolver {
    maven: Option<MavenConfig>,
}

impl LocalArtifactResolver {
    pub fn new(maven: Option<MavenConfig>) -> Self {
        Self { maven }
    }

    fn local_path(&self, artifact: &ArtifactRef) -> Result<PathBuf, ArtifactError> {
        match artifact {
            ArtifactRef::File(path) => Ok(path.clone()),
            ArtifactRef::Maven(coords) => {
                let maven = self
                    .maven
                    .as_ref()
                    .ok_or_else(|| ArtifactError::NoMavenConfig(coords.to_string()))?;
                Ok(maven.local_repository.join(coords.repository_path()))
            }
            ArtifactRef::Docker(image) => Err(ArtifactError::NoContent(image.to_string())),
        }
    }

    fn pom_path(&self, artifact: &ArtifactRef) -> Option<PathBuf> {
        match (artifact, &self.maven) {
            (ArtifactRef::Maven(coords), Some(maven)) => {
                Some(maven.local_repository.join(coords.pom_path()))
            }
            _ => None,
        }
    }
}

async fn read_file(path: &Path) -> Result<Bytes, ArtifactError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| ArtifactError::read(path, e))
}

#[async_trait]
impl ArtifactResolver for LocalArtifactResolver {
    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, ArtifactError> {
        let path = self.local_path(artifact)?;
        tracing::debug!(path = %path.display(), "reading artifact");
        read_file(&path).await
    }

    async fn project_scm(&self, artifact: &ArtifactRef) -> Result<Option<ScmInfo>, ArtifactError> {
        let Some(pom) = self.pom_path(artifact) else {
            return Ok(None);
        };
        match tokio::fs::read_to_string(&pom).await {
            Ok(content) => Ok(scm_info(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::read(pom, e)),
        }
    }

    async fn contains_entry(
        &self,
        artifact: &ArtifactRef,
        entry: &str,
    ) -> Result<bool, ArtifactError> {
        let path = self.local_path(artifact)?;
        let data = read_file(&path).await?;
        let entries = list_entries(&data).map_err(|reason| ArtifactError::Archive {
            path: path.clone(),
            reason,
        })?;
        let entry = entry.trim_start_matches('/');
        Ok(entries.iter().any(|name| name == entry))
    }
}
