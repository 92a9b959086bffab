// ABOUTME: Content fingerprints used as the build reuse key.
// ABOUTME: Lowercase hex SHA-256 over the artifact's identity and bytes.

use crate::request::{ArtifactRef, MavenCoordinates};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identity of an artifact's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactFingerprint(String);

impl ArtifactFingerprint {
    /// Wrap a fingerprint read back from the platform.
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint an artifact given its bytes, when they could be read.
///
/// Fields are length-prefixed so adjacent values cannot run into each other.
pub fn fingerprint(artifact: &ArtifactRef, content: Option<&[u8]>) -> ArtifactFingerprint {
    let mut hasher = Sha256::new();
    match artifact {
        ArtifactRef::Maven(coords) => {
            field(&mut hasher, b"maven");
            coordinates(&mut hasher, coords);
        }
        ArtifactRef::File(_) => field(&mut hasher, b"file"),
        ArtifactRef::Docker(image) => {
            field(&mut hasher, b"docker");
            field(&mut hasher, image.to_string().as_bytes());
        }
    }
    if let Some(content) = content {
        field(&mut hasher, content);
    }
    ArtifactFingerprint(hex::encode(hasher.finalize()))
}

fn coordinates(hasher: &mut Sha256, coords: &MavenCoordinates) {
    field(hasher, coords.group_id.as_bytes());
    field(hasher, coords.artifact_id.as_bytes());
    field(hasher, coords.version.as_bytes());
    field(hasher, coords.classifier.as_deref().unwrap_or("").as_bytes());
    field(hasher, coords.extension.as_bytes());
}

fn field(hasher: &mut Sha256, value: &[u8]) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value);
}
