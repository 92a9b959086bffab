// ABOUTME: Waits for a background rollout or task launch to finish.
// ABOUTME: Translates the outcome into command output, warnings and errors.

use kiln::deploy::DeployError;
use kiln::diagnostics::{Diagnostics, Warning};
use kiln::error::{Error, Result};
use kiln::output::Output;
use kiln::rollout::RolloutOutcome;
use kiln::types::BuildName;
use tokio::task::JoinHandle;

pub async fn wait_for_build(
    build: &BuildName,
    task: JoinHandle<RolloutOutcome>,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<()> {
    output.progress(&format!("  → Waiting for build {build}..."));
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            diag.warn(Warning::watch_dropped(format!(
                "stopped waiting for build {build}: {e}"
            )));
            return Ok(());
        }
    };

    match outcome {
        RolloutOutcome::RolledOut { image, .. } => {
            output.progress(&format!("  ✓ Build {build} pushed {image}"));
            Ok(())
        }
        RolloutOutcome::RolloutFailed { error, .. } => {
            Err(DeployError::from(error).into())
        }
        RolloutOutcome::BuildFailed { build, phase } => Err(Error::BuildFailed {
            build: build.into_inner(),
            phase: phase.to_string(),
        }),
        RolloutOutcome::WatchDropped(reason) => {
            diag.warn(Warning::watch_dropped(format!(
                "lost track of build {build} ({reason}); check it with `kiln status`"
            )));
            Ok(())
        }
    }
}
