// ABOUTME: Build orchestration: strategy choice, reuse by fingerprint, submission and watching.
// ABOUTME: Produces build plans from requests and hands lifecycle events to the rollout layer.

mod definition;
mod error;
mod existence;
mod git;
mod strategy;
mod submit;
mod watch;

pub use definition::{
    APP_ARTIFACT_ID_ENV, APP_GROUP_ID_ENV, APP_NAME_ENV, APP_RESOURCE_HOST_ENV,
    APP_RESOURCE_URL_ENV, APP_VERSION_ENV, BuildPlan, REPO_AUTH_PASSWORD_ENV,
    REPO_AUTH_USERNAME_ENV,
};
pub use error::BuildError;
pub use existence::{BuildDecision, ExistingBuild, check_existing};
pub use git::normalize_scm_uri;
pub use strategy::{BuildStrategy, GitSource};
pub use submit::{ensure_build_config, start_build};
pub use watch::{BuildWatcher, WatchItem, WatchRegistry, WatchSubscription};
