// ABOUTME: Control plane error types.
// ABOUTME: TransportError (snafu) covers the API client connection; PlatformError is what callers see.

use snafu::Snafu;

/// Failures outside an API status response: configuring the client, sending, watching.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("invalid API endpoint {url}"))]
    Endpoint { url: String },

    #[snafu(display("could not infer cluster configuration: {source}"))]
    Infer {
        source: kube::config::InferConfigError,
    },

    #[snafu(display("failed to create API client: {source}"))]
    Client { source: kube::Error },

    #[snafu(display("failed to build request for {path}: {source}"))]
    BuildRequest { path: String, source: http::Error },

    #[snafu(display("{kind} {name}: {source}"))]
    Request {
        kind: &'static str,
        name: String,
        source: kube::Error,
    },

    #[snafu(display("build watch failed: {source}"))]
    Watch {
        source: kube::runtime::watcher::Error,
    },
}

/// Transport error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The endpoint could not be reached at all.
    Unreachable,
    /// The connection broke mid-exchange.
    Interrupted,
    /// The request could not be formed.
    Invalid,
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Infer { .. } | TransportError::Client { .. } => {
                TransportErrorKind::Unreachable
            }
            TransportError::Request { .. } | TransportError::Watch { .. } => {
                TransportErrorKind::Interrupted
            }
            TransportError::BuildRequest { .. } | TransportError::Endpoint { .. } => {
                TransportErrorKind::Invalid
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name} was modified concurrently")]
    Conflict { kind: &'static str, name: String },

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PlatformError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Conflict { .. } => true,
            PlatformError::Api { status, .. } => *status == 429 || *status >= 500,
            PlatformError::Transport(e) => e.kind() != TransportErrorKind::Invalid,
            PlatformError::NotFound { .. } | PlatformError::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(e: serde_json::Error) -> Self {
        PlatformError::Decode(e.to_string())
    }
}
