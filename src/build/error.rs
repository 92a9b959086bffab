// ABOUTME: Error types for build selection, reuse checks and submission.
// ABOUTME: Wraps artifact, request and platform failures with the build step that hit them.

use crate::artifact::ArtifactError;
use crate::platform::PlatformError;
use crate::request::RequestError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The artifact could not be read for fingerprinting or upload.
    #[error("artifact unavailable: {0}")]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("failed to read Dockerfile {path}: {source}")]
    Dockerfile {
        path: String,
        source: std::io::Error,
    },

    /// Repository credentials or build environment could not be resolved.
    #[error("build environment: {0}")]
    Environment(String),

    #[error("failed to list builds for {app_id}: {source}")]
    Lookup {
        app_id: String,
        source: PlatformError,
    },

    #[error("failed to submit build {config}: {source}")]
    Submit {
        config: String,
        source: PlatformError,
    },

    #[error("failed to open build watch for {selector}: {source}")]
    Watch {
        selector: String,
        source: PlatformError,
    },
}

impl BuildError {
    /// Whether repeating the deploy may get past this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            BuildError::Lookup { source, .. }
            | BuildError::Submit { source, .. }
            | BuildError::Watch { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
