// ABOUTME: Image stream operations for the cluster control plane.
// ABOUTME: Image streams receive the output of every build.

use crate::platform::error::PlatformError;
use crate::platform::model::ImageStreamSpec;
use async_trait::async_trait;

#[async_trait]
pub trait ImageStreamOps: Send + Sync {
    /// Create the image stream unless it already exists.
    async fn ensure_image_stream(&self, spec: &ImageStreamSpec) -> Result<(), PlatformError>;
}
