// ABOUTME: Pod operations for the cluster control plane.
// ABOUTME: Task pods run once; workload pods are only listed and cleaned up.

use crate::platform::error::PlatformError;
use crate::platform::model::{PodSpec, PodSummary};
use crate::types::{PodName, Selector};
use async_trait::async_trait;

#[async_trait]
pub trait PodOps: Send + Sync {
    async fn create_pod(&self, spec: &PodSpec) -> Result<(), PlatformError>;

    /// `None` when the pod does not exist.
    async fn get_pod(&self, name: &PodName) -> Result<Option<PodSummary>, PlatformError>;

    async fn list_pods(&self, selector: &Selector) -> Result<Vec<PodSummary>, PlatformError>;

    async fn delete_pod(&self, name: &PodName) -> Result<(), PlatformError>;
}
