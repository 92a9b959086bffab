// ABOUTME: Errors raised while locating, reading or inspecting artifacts.
// ABOUTME: All of them are fatal for the request and happen before any platform call.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a readable archive: {reason}")]
    Archive { path: PathBuf, reason: &'static str },

    #[error("image artifact {0} has no content to read")]
    NoContent(String),

    #[error("no maven configuration available to resolve {0}")]
    NoMavenConfig(String),
}

impl ArtifactError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound(path)
        } else {
            ArtifactError::Read { path, source }
        }
    }
}
