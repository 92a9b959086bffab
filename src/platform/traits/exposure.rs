// ABOUTME: Network exposure operations for the cluster control plane.
// ABOUTME: Services give workloads a stable address; routes publish them externally.

use crate::platform::error::PlatformError;
use crate::platform::model::{RouteSpec, ServiceSpec};
use crate::types::Selector;
use async_trait::async_trait;

#[async_trait]
pub trait ExposureOps: Send + Sync {
    async fn apply_service(&self, spec: &ServiceSpec) -> Result<(), PlatformError>;

    async fn apply_route(&self, spec: &RouteSpec) -> Result<(), PlatformError>;

    /// Delete every service matching `selector`, returning how many were removed.
    async fn delete_services(&self, selector: &Selector) -> Result<usize, PlatformError>;

    /// Delete every route matching `selector`, returning how many were removed.
    async fn delete_routes(&self, selector: &Selector) -> Result<usize, PlatformError>;
}
