// ABOUTME: In-memory artifact resolver for integration tests.
// ABOUTME: Artifacts are keyed by their display form; metadata lookups can be made to fail.

use async_trait::async_trait;
use bytes::Bytes;
use kiln::artifact::{ArtifactError, ArtifactResolver, ScmInfo};
use kiln::request::ArtifactRef;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Default)]
pub struct FakeResolver {
    contents: Mutex<BTreeMap<String, Bytes>>,
    scm: Mutex<BTreeMap<String, ScmInfo>>,
    entries: Mutex<BTreeMap<String, BTreeSet<String>>>,
    broken_metadata: Mutex<BTreeSet<String>>,
}

impl FakeResolver {
    pub fn with_content(self, artifact: &ArtifactRef, content: &[u8]) -> Self {
        self.contents
            .lock()
            .insert(artifact.to_string(), Bytes::copy_from_slice(content));
        self
    }

    pub fn with_scm(self, artifact: &ArtifactRef, connection: &str, tag: Option<&str>) -> Self {
        self.scm.lock().insert(
            artifact.to_string(),
            ScmInfo {
                connection: connection.to_string(),
                tag: tag.map(str::to_string),
            },
        );
        self
    }

    pub fn with_entry(self, artifact: &ArtifactRef, entry: &str) -> Self {
        self.entries
            .lock()
            .entry(artifact.to_string())
            .or_default()
            .insert(entry.to_string());
        self
    }

    /// Make project metadata lookups for `artifact` fail.
    pub fn with_broken_metadata(self, artifact: &ArtifactRef) -> Self {
        self.broken_metadata.lock().insert(artifact.to_string());
        self
    }

    pub fn replace_content(&self, artifact: &ArtifactRef, content: &[u8]) {
        self.contents
            .lock()
            .insert(artifact.to_string(), Bytes::copy_from_slice(content));
    }

    fn broken(&self, artifact: &ArtifactRef) -> Result<(), ArtifactError> {
        if self.broken_metadata.lock().contains(&artifact.to_string()) {
            return Err(ArtifactError::Archive {
                path: PathBuf::from(artifact.to_string()),
                reason: "truncated central directory",
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactResolver for FakeResolver {
    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, ArtifactError> {
        if let ArtifactRef::Docker(image) = artifact {
            return Err(ArtifactError::NoContent(image.to_string()));
        }
        self.contents
            .lock()
            .get(&artifact.to_string())
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(PathBuf::from(artifact.to_string())))
    }

    async fn project_scm(&self, artifact: &ArtifactRef) -> Result<Option<ScmInfo>, ArtifactError> {
        self.broken(artifact)?;
        Ok(self.scm.lock().get(&artifact.to_string()).cloned())
    }

    async fn contains_entry(
        &self,
        artifact: &ArtifactRef,
        entry: &str,
    ) -> Result<bool, ArtifactError> {
        self.broken(artifact)?;
        Ok(self
            .entries
            .lock()
            .get(&artifact.to_string())
            .is_some_and(|entries| entries.contains(entry)))
    }
}
