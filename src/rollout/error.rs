// ABOUTME: Rollout failures, aggregated across the instances of one application.
// ABOUTME: One instance failing never stops the others from being attempted.

use crate::platform::PlatformError;
use crate::request::RequestError;
use crate::types::{BuildName, WorkloadName};

/// A single workload that could not be rolled out.
#[derive(Debug)]
pub struct InstanceFailure {
    pub workload: WorkloadName,
    pub error: PlatformError,
}

#[derive(Debug, thiserror::Error)]
pub enum RolloutError {
    #[error("{} of {attempted} rollouts failed: {}", .failures.len(), describe(.failures))]
    Instances {
        attempted: usize,
        failures: Vec<InstanceFailure>,
    },

    #[error("build {0} completed without an output image")]
    NoImage(BuildName),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("task launch failed: {0}")]
    Launch(String),
}

fn describe(failures: &[InstanceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.workload, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RolloutError {
    /// Workloads whose rollout failed, if this is an aggregated failure.
    pub fn failed_workloads(&self) -> Vec<&WorkloadName> {
        match self {
            RolloutError::Instances { failures, .. } => {
                failures.iter().map(|f| &f.workload).collect()
            }
            _ => Vec::new(),
        }
    }
}
