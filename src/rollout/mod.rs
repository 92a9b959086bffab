// ABOUTME: Turns a completed build into running workloads or a launched task.
// ABOUTME: Coordinator state machine, completion handlers and indexed fan-out.

mod coordinator;
mod error;
mod fanout;

pub use coordinator::{
    CompletionHandler, CoordinatorState, ImageLauncher, RolloutCoordinator, RolloutOutcome,
    TaskLaunch, WorkloadRollout,
};
pub use error::{InstanceFailure, RolloutError};
pub use fanout::{RolloutTarget, rollout_all, targets};
