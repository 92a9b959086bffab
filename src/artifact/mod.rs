// ABOUTME: Artifact access: content, project metadata, archive listing and fingerprints.
// ABOUTME: Everything here runs before any platform object is created.

mod archive;
mod error;
mod fingerprint;
mod pom;
mod resolver;

pub use error::ArtifactError;
pub use fingerprint::{ArtifactFingerprint, fingerprint};
pub use pom::ScmInfo;
pub use resolver::{ArtifactResolver, LocalArtifactResolver};

use bytes::Bytes;

use crate::request::ArtifactRef;

/// Artifact bytes with the fingerprint computed over them.
#[derive(Debug, Clone)]
pub struct ArtifactContent {
    pub bytes: Bytes,
    pub fingerprint: ArtifactFingerprint,
}

/// Read an artifact once and fingerprint what was read.
///
/// Every failure is fatal: a build must upload exactly the bytes its
/// fingerprint was computed over.
pub async fn load(
    resolver: &dyn ArtifactResolver,
    artifact: &ArtifactRef,
) -> Result<ArtifactContent, ArtifactError> {
    let bytes = resolver.read(artifact).await?;
    let fingerprint = fingerprint(artifact, Some(&bytes));
    tracing::debug!(%artifact, bytes = bytes.len(), %fingerprint, "artifact loaded");
    Ok(ArtifactContent { bytes, fingerprint })
}
