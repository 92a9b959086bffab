// ABOUTME: Error types for deploying, launching and tearing down applications.
// ABOUTME: Definition-time problems are returned before any platform object is touched.

use crate::build::BuildError;
use crate::platform::PlatformError;
use crate::request::RequestError;
use crate::rollout::RolloutError;

/// Errors returned by deployer and launcher operations.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("application {0} is already deployed")]
    AlreadyDeployed(String),

    #[error("application {0} is not deployed")]
    NotDeployed(String),

    /// A route and a node port cannot both expose the same service.
    #[error("{0}: route and node port exposure cannot be combined")]
    ConflictingExposure(String),

    #[error("no image available for {0}: rebuilding is disabled and no earlier build exists")]
    NoImage(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),

    #[error("{step} failed: {source}")]
    Platform {
        step: &'static str,
        source: PlatformError,
    },
}

impl DeployError {
    pub(crate) fn platform(step: &'static str) -> impl FnOnce(PlatformError) -> Self {
        move |source| DeployError::Platform { step, source }
    }

    /// Kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Request(_)
            | DeployError::AlreadyDeployed(_)
            | DeployError::NotDeployed(_)
            | DeployError::ConflictingExposure(_) => DeployErrorKind::Definition,
            DeployError::Build(e) if e.is_retryable() => DeployErrorKind::Retryable,
            DeployError::Platform { source, .. } if source.is_retryable() => {
                DeployErrorKind::Retryable
            }
            _ => DeployErrorKind::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Rejected before anything was created; fix the request.
    Definition,
    /// Repeating the same call may succeed.
    Retryable,
    Failed,
}
