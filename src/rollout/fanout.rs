// ABOUTME: Expands one rollout into per-instance rollouts for indexed applications.
// ABOUTME: Instances are triggered concurrently and their failures collected together.

use futures::future::join_all;

use crate::platform::WorkloadOps;
use crate::platform::model::RolloutRequest;
use crate::types::{AppId, ImageRef, WorkloadName};

use super::error::{InstanceFailure, RolloutError};

/// A workload to roll out, with the index it is pinned to when indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutTarget {
    pub workload: WorkloadName,
    pub instance_index: Option<u32>,
}

/// Workloads making up an application.
///
/// Unindexed applications are one workload named after the app. Indexed
/// applications are `count` single-replica workloads `{id}-{index}`.
pub fn targets(app_id: &AppId, indexed: bool, count: u32) -> Vec<RolloutTarget> {
    if !indexed {
        return vec![RolloutTarget {
            workload: app_id.workload(),
            instance_index: None,
        }];
    }
    (0..count)
        .map(|index| RolloutTarget {
            workload: app_id.instance(index),
            instance_index: Some(index),
        })
        .collect()
}

/// Roll every target out to `image`. Returns how many were triggered.
pub async fn rollout_all<W: WorkloadOps + ?Sized>(
    workloads: &W,
    targets: &[RolloutTarget],
    image: &ImageRef,
) -> Result<usize, RolloutError> {
    let requests: Vec<RolloutRequest> = targets
        .iter()
        .map(|target| RolloutRequest {
            name: target.workload.clone(),
            image: image.clone(),
            instance_index: target.instance_index,
        })
        .collect();

    let results = join_all(requests.iter().map(|request| workloads.rollout(request))).await;

    let failures: Vec<InstanceFailure> = requests
        .into_iter()
        .zip(results)
        .filter_map(|(request, result)| {
            result.err().map(|error| {
                tracing::warn!(workload = %request.name, %error, "rollout failed");
                InstanceFailure {
                    workload: request.name,
                    error,
                }
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(targets.len())
    } else {
        Err(RolloutError::Instances {
            attempted: targets.len(),
            failures,
        })
    }
}
