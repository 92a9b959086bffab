// ABOUTME: Build pipeline operations for the cluster control plane.
// ABOUTME: Create-or-replace build configs, start runs, list and watch builds.

use crate::platform::error::PlatformError;
use crate::platform::model::{BuildConfigSpec, BuildRecord, BuildRequestSpec};
use crate::types::Selector;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Stream of build observations from one server-side watch.
pub type BuildEventStream = Pin<Box<dyn Stream<Item = Result<BuildRecord, PlatformError>> + Send>>;

#[async_trait]
pub trait BuildOps: Send + Sync {
    /// Create the build config, or replace it in place if it exists.
    async fn apply_build_config(&self, spec: &BuildConfigSpec) -> Result<(), PlatformError>;

    /// Start a build of `config` with templated parameters.
    async fn instantiate_build(
        &self,
        config: &str,
        request: &BuildRequestSpec,
    ) -> Result<BuildRecord, PlatformError>;

    /// Start a build of `config`, uploading `payload` as the file `file_name`.
    async fn instantiate_binary(
        &self,
        config: &str,
        file_name: &str,
        payload: Bytes,
    ) -> Result<BuildRecord, PlatformError>;

    async fn list_builds(&self, selector: &Selector) -> Result<Vec<BuildRecord>, PlatformError>;

    /// Open a watch on builds matching `selector`. Dropping the stream closes it.
    async fn watch_builds(&self, selector: &Selector) -> Result<BuildEventStream, PlatformError>;
}
