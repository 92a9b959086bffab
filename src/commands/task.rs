// ABOUTME: Launch and cleanup command implementations for one-shot tasks.
// ABOUTME: A launch prints the task id used later by status checks and cleanup.

use super::connect::connect;
use super::wait::wait_for_build;
use crate::cli::AppArgs;
use kiln::config::Config;
use kiln::deploy::{Launched, TaskLauncher};
use kiln::diagnostics::{Diagnostics, Warning};
use kiln::error::Result;
use kiln::output::Output;
use kiln::types::PodName;

pub async fn launch(config: Config, args: AppArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    let (platform, resolver) = connect(&config, &output).await?;
    let launcher = TaskLauncher::new(platform, resolver, config);
    let mut diag = Diagnostics::default();

    output.progress(&format!("Launching {} ({})", args.name, args.artifact));
    let Launched {
        task_id,
        build,
        launch,
    } = match launcher.launch(&args.request()).await {
        Ok(launched) => launched,
        Err(e) => {
            launcher.shutdown();
            return Err(e.into());
        }
    };

    let waited = match (build, launch) {
        (Some(build), Some(task)) if !args.detach => {
            wait_for_build(&build, task, &output, &mut diag).await
        }
        (Some(build), Some(_)) => {
            diag.warn(Warning::watch_dropped(format!(
                "detached before build {build} finished; task {task_id} will not start"
            )));
            Ok(())
        }
        _ => Ok(()),
    };
    launcher.shutdown();
    waited?;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
    output.success(&format!("Launched task {task_id}"));
    Ok(())
}

pub async fn cleanup(config: Config, task_id: String, mut output: Output) -> Result<()> {
    output.start_timer();
    let (platform, resolver) = connect(&config, &output).await?;
    let launcher = TaskLauncher::new(platform, resolver, config);
    let task_id = PodName::new(task_id);

    let status = launcher.status(&task_id).await?;
    output.progress(&format!("  → Task {task_id} is {status:?}"));
    let result = launcher.cleanup(&task_id).await;
    launcher.shutdown();
    result?;

    output.success(&format!("Cleaned up task {task_id}"));
    Ok(())
}
