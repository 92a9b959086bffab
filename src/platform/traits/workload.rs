// ABOUTME: Long-running workload operations for the cluster control plane.
// ABOUTME: Apply, roll out, scale, list and delete deployment configs.

use crate::platform::error::PlatformError;
use crate::platform::model::{RolloutRequest, WorkloadSpec, WorkloadSummary};
use crate::types::{Selector, WorkloadName};
use async_trait::async_trait;

#[async_trait]
pub trait WorkloadOps: Send + Sync {
    /// Create the workload, or replace its spec in place if it exists.
    async fn apply_workload(&self, spec: &WorkloadSpec) -> Result<(), PlatformError>;

    /// Set the workload's image (and instance index) and start a new rollout.
    async fn rollout(&self, request: &RolloutRequest) -> Result<(), PlatformError>;

    async fn scale_workload(&self, name: &WorkloadName, replicas: u32)
    -> Result<(), PlatformError>;

    async fn list_workloads(&self, selector: &Selector)
    -> Result<Vec<WorkloadSummary>, PlatformError>;

    async fn delete_workload(&self, name: &WorkloadName) -> Result<(), PlatformError>;
}
